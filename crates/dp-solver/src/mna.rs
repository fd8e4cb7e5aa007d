//! Modified nodal analysis over complex phasors.

use std::f64::consts::TAU;
use std::sync::Arc;

use dp_core::{Domain, PhaseGroup, hz, omega};
use dp_results::LabeledVector;
use dp_sim::{EventPayload, SimulationConfig, Solver, SolverError, SolverResult};
use dp_topology::{EntityKind, IndexMap, Params, Topology};
use nalgebra::{DMatrix, DVector, Dyn, LU};
use num_complex::Complex64;
use tracing::debug;

use crate::companion::{self, Companion};

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Version string recorded in run manifests.
pub const SOLVER_VERSION: &str = concat!("mna-", env!("CARGO_PKG_VERSION"));

/// Reference MNA solver.
///
/// Stateless apart from counters; all per-topology state lives in
/// [`MnaHandle`].
#[derive(Debug, Default, Clone)]
pub struct MnaSolver {
    accepted: usize,
}

impl MnaSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of topologies accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

#[derive(Debug, Clone)]
struct Branch {
    name: String,
    kind: EntityKind,
    a: Option<usize>,
    b: Option<usize>,
    params: Params,
    /// Extra MNA row for ideal voltage sources.
    source_row: Option<usize>,
    /// Branch current at the last solved time.
    current: Complex64,
    /// Parameters changed by events since acceptance.
    overrides: Params,
}

impl Branch {
    fn param(&self, name: &str) -> f64 {
        self.params.get(name).unwrap_or(0.0)
    }

    fn voltage(&self, x: &DVector<Complex64>) -> Complex64 {
        let va = self.a.map_or(ZERO, |r| x[r]);
        let vb = self.b.map_or(ZERO, |r| x[r]);
        va - vb
    }

    fn switch_resistance(&self) -> f64 {
        if self.param("closed") == 1.0 {
            self.param("closed_resistance")
        } else {
            self.param("open_resistance")
        }
    }

    /// Reference phasor or instantaneous value of a source.
    fn source_value(&self, reference: &str, domain: Domain, freq: f64, t: f64) -> Complex64 {
        let magnitude = self.param(reference);
        let phase = self.param("phase");
        match domain {
            Domain::Dp => Complex64::from_polar(magnitude, phase),
            Domain::Emt => Complex64::new(magnitude * (TAU * freq * t + phase).cos(), 0.0),
        }
    }
}

/// Per-topology solver state.
#[derive(Debug)]
pub struct MnaHandle {
    domain: Domain,
    frequency: f64,
    omega: f64,
    nodes: usize,
    node_names: Vec<String>,
    size: usize,
    branches: Vec<Branch>,
    labels: Arc<[String]>,
    solution: DVector<Complex64>,
    lu: Option<LU<Complex64, Dyn, Dyn>>,
    factored_dt: f64,
    dirty: bool,
    factorizations: u64,
}

impl MnaHandle {
    /// Number of LU factorizations performed.
    pub fn factorizations(&self) -> u64 {
        self.factorizations
    }

    /// Complex voltage of a non-reference node at the last solved time.
    pub fn node_voltage(&self, row: usize) -> Option<Complex64> {
        (row < self.nodes).then(|| self.solution[row])
    }

    /// Current through a branch at the last solved time, from terminal a to b.
    pub fn branch_current(&self, name: &str) -> Option<Complex64> {
        self.branches
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.current)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn companion(&self, branch: &Branch, dt: f64) -> Option<Companion> {
        let v_k = branch.voltage(&self.solution);
        match branch.kind {
            EntityKind::Inductor => Some(companion::series_rl(
                0.0,
                branch.param("inductance"),
                self.omega,
                dt,
                v_k,
                branch.current,
            )),
            EntityKind::RxLine => Some(companion::series_rl(
                branch.param("resistance"),
                branch.param("inductance"),
                self.omega,
                dt,
                v_k,
                branch.current,
            )),
            EntityKind::Capacitor => Some(companion::capacitor(
                branch.param("capacitance"),
                self.omega,
                dt,
                v_k,
                branch.current,
            )),
            _ => None,
        }
    }

    fn branch_conductance(&self, branch: &Branch, dt: f64) -> Option<Complex64> {
        match branch.kind {
            EntityKind::Resistor => Some(Complex64::new(1.0 / branch.param("resistance"), 0.0)),
            EntityKind::Switch => Some(Complex64::new(1.0 / branch.switch_resistance(), 0.0)),
            EntityKind::ResistiveVoltageSource => {
                Some(Complex64::new(1.0 / branch.param("resistance"), 0.0))
            }
            EntityKind::Inductor | EntityKind::RxLine | EntityKind::Capacitor => {
                self.companion(branch, dt).map(|c| c.g)
            }
            EntityKind::VoltageSource | EntityKind::CurrentSource => None,
        }
    }

    fn assemble(&self, dt: f64) -> DMatrix<Complex64> {
        let mut m = DMatrix::from_element(self.size, self.size, ZERO);
        for branch in &self.branches {
            if let Some(g) = self.branch_conductance(branch, dt) {
                stamp_conductance(&mut m, branch.a, branch.b, g);
            }
            if let Some(row) = branch.source_row {
                // v_b - v_a = V
                let one = Complex64::new(1.0, 0.0);
                if let Some(a) = branch.a {
                    m[(a, row)] -= one;
                    m[(row, a)] -= one;
                }
                if let Some(b) = branch.b {
                    m[(b, row)] += one;
                    m[(row, b)] += one;
                }
            }
        }
        m
    }

    fn refactor(&mut self, dt: f64) -> SolverResult<()> {
        let lu = self.assemble(dt).lu();
        if !lu.is_invertible() {
            return Err(SolverError::Singular {
                what: "system matrix is not invertible (floating node or source loop?)"
                    .to_string(),
            });
        }
        self.lu = Some(lu);
        self.factored_dt = dt;
        self.dirty = false;
        self.factorizations += 1;
        debug!(size = self.size, dt, "factorized system matrix");
        Ok(())
    }

    fn right_hand_side(&self, t_next: f64, companions: &[Option<Companion>]) -> DVector<Complex64> {
        let mut rhs = DVector::from_element(self.size, ZERO);
        for (branch, comp) in self.branches.iter().zip(companions) {
            let injection = match branch.kind {
                EntityKind::CurrentSource => Some(branch.source_value(
                    "current_ref",
                    self.domain,
                    self.frequency,
                    t_next,
                )),
                EntityKind::ResistiveVoltageSource => Some(
                    branch.source_value("voltage_ref", self.domain, self.frequency, t_next)
                        / branch.param("resistance"),
                ),
                EntityKind::VoltageSource => {
                    if let Some(row) = branch.source_row {
                        rhs[row] = branch.source_value(
                            "voltage_ref",
                            self.domain,
                            self.frequency,
                            t_next,
                        );
                    }
                    None
                }
                // The history current flows a -> b inside the branch.
                _ => comp.map(|c| c.hist),
            };
            if let Some(i) = injection {
                if let Some(a) = branch.a {
                    rhs[a] -= i;
                }
                if let Some(b) = branch.b {
                    rhs[b] += i;
                }
            }
        }
        rhs
    }

    fn output(&self) -> LabeledVector {
        let values = match self.domain {
            Domain::Dp => (0..self.nodes)
                .flat_map(|r| [self.solution[r].re, self.solution[r].im])
                .collect(),
            Domain::Emt => (0..self.nodes).map(|r| self.solution[r].re).collect(),
        };
        LabeledVector::new(Arc::clone(&self.labels), values)
    }

    fn branch_mut(&mut self, name: &str) -> SolverResult<&mut Branch> {
        self.branches
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| SolverError::UnknownTarget {
                name: name.to_string(),
            })
    }
}

fn stamp_conductance(
    m: &mut DMatrix<Complex64>,
    a: Option<usize>,
    b: Option<usize>,
    g: Complex64,
) {
    if let Some(a) = a {
        m[(a, a)] += g;
    }
    if let Some(b) = b {
        m[(b, b)] += g;
    }
    if let (Some(a), Some(b)) = (a, b) {
        m[(a, b)] -= g;
        m[(b, a)] -= g;
    }
}

fn reference_parameter(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::VoltageSource | EntityKind::ResistiveVoltageSource => Some("voltage_ref"),
        EntityKind::CurrentSource => Some("current_ref"),
        _ => None,
    }
}

impl Solver for MnaSolver {
    type Handle = MnaHandle;

    fn accept(
        &mut self,
        topology: &Topology,
        config: &SimulationConfig,
    ) -> SolverResult<MnaHandle> {
        let index = IndexMap::from_topology(topology);
        let nodes = index.node_count();
        let mut size = nodes;
        let mut branches = Vec::with_capacity(topology.entities().len());

        for entity in topology.entities() {
            let ty = entity.entity_type();
            if ty.domain != config.domain {
                return Err(SolverError::Unsupported {
                    what: format!(
                        "entity '{}' is {} but the run is {}",
                        entity.name(),
                        ty.domain,
                        config.domain
                    ),
                });
            }
            if ty.phase != PhaseGroup::Ph1 {
                return Err(SolverError::Unsupported {
                    what: format!(
                        "entity '{}': only single-phase entities are supported",
                        entity.name()
                    ),
                });
            }
            let [a, b] = [0, 1].map(|i| index.row(topology, &entity.terminals()[i]));
            let source_row = (ty.kind == EntityKind::VoltageSource).then(|| {
                size += 1;
                size - 1
            });
            branches.push(Branch {
                name: entity.name().to_string(),
                kind: ty.kind,
                a,
                b,
                params: entity.params().clone(),
                source_row,
                current: ZERO,
                overrides: Params::default(),
            });
        }

        let labels: Arc<[String]> = match config.domain {
            Domain::Dp => index
                .names()
                .iter()
                .flat_map(|n| [format!("{n}.re"), format!("{n}.im")])
                .collect(),
            Domain::Emt => index.names().to_vec().into(),
        };

        let frequency = topology.frequency();
        let w = match config.domain {
            Domain::Dp => omega(hz(frequency)),
            Domain::Emt => 0.0,
        };

        let mut handle = MnaHandle {
            domain: config.domain,
            frequency,
            omega: w,
            nodes,
            node_names: index.names().to_vec(),
            size,
            branches,
            labels,
            solution: DVector::from_element(size, ZERO),
            lu: None,
            factored_dt: config.timestep,
            dirty: true,
            factorizations: 0,
        };
        handle.refactor(config.timestep)?;
        self.accepted += 1;
        debug!(nodes, size, domain = %config.domain, "accepted topology");
        Ok(handle)
    }

    fn advance(
        &mut self,
        handle: &mut MnaHandle,
        time: f64,
        dt: f64,
    ) -> SolverResult<LabeledVector> {
        if handle.dirty || handle.factored_dt != dt {
            handle.refactor(dt)?;
        }
        let t_next = time + dt;

        let companions: Vec<Option<Companion>> = handle
            .branches
            .iter()
            .map(|b| handle.companion(b, dt))
            .collect();
        let rhs = handle.right_hand_side(t_next, &companions);

        let lu = handle.lu.as_ref().ok_or_else(|| SolverError::Singular {
            what: "no factorization available".to_string(),
        })?;
        let x = lu.solve(&rhs).ok_or_else(|| SolverError::Singular {
            what: "LU solve failed".to_string(),
        })?;
        if x.iter().any(|v| !(v.re.is_finite() && v.im.is_finite())) {
            return Err(SolverError::Diverged { time: t_next });
        }

        for (branch, comp) in handle.branches.iter_mut().zip(&companions) {
            let v = branch.voltage(&x);
            branch.current = match (branch.kind, comp) {
                (_, Some(c)) => c.current(v),
                (EntityKind::Resistor, None) => v / branch.param("resistance"),
                (EntityKind::Switch, None) => v / branch.switch_resistance(),
                (EntityKind::VoltageSource, None) => {
                    branch.source_row.map_or(ZERO, |row| x[row])
                }
                (EntityKind::CurrentSource, None) => branch.source_value(
                    "current_ref",
                    handle.domain,
                    handle.frequency,
                    t_next,
                ),
                _ => branch.current,
            };
        }
        handle.solution = x;
        Ok(handle.output())
    }

    fn apply_event(&mut self, handle: &mut MnaHandle, payload: &EventPayload) -> SolverResult<()> {
        match payload {
            EventPayload::SetParameter {
                entity,
                parameter,
                value,
            } => {
                let branch = handle.branch_mut(entity)?;
                branch
                    .kind
                    .check_parameter(parameter, *value)
                    .map_err(|e| SolverError::InvalidValue {
                        what: e.to_string(),
                    })?;
                branch.params.set(parameter.as_str(), *value);
                branch.overrides.set(parameter.as_str(), *value);
                handle.dirty = true;
                Ok(())
            }
            EventPayload::ExternalSignal { channel, value } => {
                let Some(branch) = handle.branches.iter_mut().find(|b| &b.name == channel) else {
                    debug!(channel = %channel, "no entity listens on channel");
                    return Ok(());
                };
                let reference =
                    reference_parameter(branch.kind).ok_or_else(|| SolverError::InvalidValue {
                        what: format!("entity '{channel}' is not a source"),
                    })?;
                branch.params.set(reference, *value);
                branch.overrides.set(reference, *value);
                Ok(())
            }
            EventPayload::SwitchTopology { .. } => Err(SolverError::InvalidValue {
                what: "topology switching is handled by the driver".to_string(),
            }),
        }
    }

    /// Node voltages match by node name; branch currents, source currents and
    /// event overrides match by entity name and kind. Anything unmatched
    /// starts from zero.
    fn switch_from(&mut self, from: &MnaHandle, to: &mut MnaHandle) -> SolverResult<()> {
        if from.domain != to.domain {
            return Err(SolverError::Unsupported {
                what: format!("cannot switch from {} to {}", from.domain, to.domain),
            });
        }

        to.solution.fill(ZERO);
        for (row, name) in to.node_names.iter().enumerate() {
            if let Some(src) = from.node_names.iter().position(|n| n == name) {
                to.solution[row] = from.solution[src];
            }
        }

        let mut carried = 0usize;
        for branch in &mut to.branches {
            branch.current = ZERO;
            let Some(prev) = from
                .branches
                .iter()
                .find(|b| b.name == branch.name && b.kind == branch.kind)
            else {
                continue;
            };
            branch.current = prev.current;
            if let (Some(row), Some(src)) = (branch.source_row, prev.source_row) {
                to.solution[row] = from.solution[src];
            }
            for (name, &value) in prev.overrides.iter() {
                branch.params.set(name.as_str(), value);
                branch.overrides.set(name.as_str(), value);
            }
            carried += 1;
        }
        to.dirty = true;
        debug!(carried, branches = to.branches.len(), "carried state across topology switch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::{Domain, PhaseGroup};
    use dp_topology::{Entity, EntityType, Node};

    fn ty(domain: Domain, kind: EntityKind) -> EntityType {
        EntityType::new(domain, PhaseGroup::Ph1, kind)
    }

    /// 10 V source feeding two 1 ohm resistors in series.
    fn divider(domain: Domain) -> Topology {
        let gnd = Node::ground();
        let n1 = Node::new("n1");
        let n2 = Node::new("n2");
        let vs = Entity::connect(
            ty(domain, EntityKind::VoltageSource),
            "vs",
            &[&gnd, &n1],
            Params::new().with("voltage_ref", 10.0),
        )
        .unwrap();
        let r1 = Entity::connect(
            ty(domain, EntityKind::Resistor),
            "r1",
            &[&n1, &n2],
            Params::new().with("resistance", 1.0),
        )
        .unwrap();
        let r2 = Entity::connect(
            ty(domain, EntityKind::Resistor),
            "r2",
            &[&n2, &gnd],
            Params::new().with("resistance", 1.0),
        )
        .unwrap();
        Topology::new(50.0, vec![gnd, n1, n2], vec![vs, r1, r2]).unwrap()
    }

    fn config(domain: Domain) -> SimulationConfig {
        SimulationConfig::new(0.01, 1e-4, domain).unwrap()
    }

    #[test]
    fn switch_carries_matching_state_and_overrides() {
        let mut solver = MnaSolver::new();
        let main = divider(Domain::Dp);
        let mut entities = main.entities().to_vec();
        entities.push(
            Entity::connect(
                ty(Domain::Dp, EntityKind::Resistor),
                "r3",
                &[&Node::new("n2"), &Node::ground()],
                Params::new().with("resistance", 1.0),
            )
            .unwrap(),
        );
        let alternate = main.with_entities(entities).unwrap();

        let cfg = config(Domain::Dp);
        let mut from = solver.accept(&main, &cfg).unwrap();
        let mut to = solver.accept(&alternate, &cfg).unwrap();
        let raise_r2 = EventPayload::SetParameter {
            entity: "r2".into(),
            parameter: "resistance".into(),
            value: 3.0,
        };
        solver.apply_event(&mut from, &raise_r2).unwrap();
        solver.advance(&mut from, 0.0, 1e-4).unwrap();
        solver.switch_from(&from, &mut to).unwrap();

        assert_eq!(to.node_voltage(0), from.node_voltage(0));
        assert_eq!(to.node_voltage(1), from.node_voltage(1));
        assert_eq!(to.branch_current("r1"), from.branch_current("r1"));
        assert_eq!(to.branch_current("r3"), Some(ZERO));

        // r2 stays at 3 ohm in the new topology, now parallel to r3.
        let out = solver.advance(&mut to, 1e-4, 1e-4).unwrap();
        let expected = 10.0 * 0.75 / 1.75;
        assert!((out.get("n2.re").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn switch_across_domains_is_unsupported() {
        let mut solver = MnaSolver::new();
        let dp = solver.accept(&divider(Domain::Dp), &config(Domain::Dp)).unwrap();
        let mut emt = solver.accept(&divider(Domain::Emt), &config(Domain::Emt)).unwrap();
        assert!(matches!(
            solver.switch_from(&dp, &mut emt),
            Err(SolverError::Unsupported { .. })
        ));
    }

    #[test]
    fn dp_divider_halves_source() {
        let mut solver = MnaSolver::new();
        let mut h = solver.accept(&divider(Domain::Dp), &config(Domain::Dp)).unwrap();
        let out = solver.advance(&mut h, 0.0, 1e-4).unwrap();
        assert_eq!(out.labels(), ["n1.re", "n1.im", "n2.re", "n2.im"]);
        assert!((out.get("n1.re").unwrap() - 10.0).abs() < 1e-12);
        assert!((out.get("n2.re").unwrap() - 5.0).abs() < 1e-12);
        assert!(out.get("n2.im").unwrap().abs() < 1e-12);
        assert!((h.branch_current("r1").unwrap().re - 5.0).abs() < 1e-12);
    }

    #[test]
    fn emt_divider_follows_cosine() {
        let mut solver = MnaSolver::new();
        let mut h = solver.accept(&divider(Domain::Emt), &config(Domain::Emt)).unwrap();
        let t = 0.0012;
        let out = solver.advance(&mut h, t, 1e-4).unwrap();
        let expected = 5.0 * (TAU * 50.0 * (t + 1e-4)).cos();
        assert_eq!(out.labels(), ["n1", "n2"]);
        assert!((out.get("n2").unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn parameter_event_refactors() {
        let mut solver = MnaSolver::new();
        let mut h = solver.accept(&divider(Domain::Dp), &config(Domain::Dp)).unwrap();
        assert_eq!(h.factorizations(), 1);
        solver.advance(&mut h, 0.0, 1e-4).unwrap();
        assert_eq!(h.factorizations(), 1);

        solver
            .apply_event(
                &mut h,
                &EventPayload::SetParameter {
                    entity: "r2".into(),
                    parameter: "resistance".into(),
                    value: 3.0,
                },
            )
            .unwrap();
        let out = solver.advance(&mut h, 1e-4, 1e-4).unwrap();
        assert_eq!(h.factorizations(), 2);
        assert!((out.get("n2.re").unwrap() - 7.5).abs() < 1e-12);
    }

    #[test]
    fn external_signal_sets_source_reference() {
        let mut solver = MnaSolver::new();
        let mut h = solver.accept(&divider(Domain::Dp), &config(Domain::Dp)).unwrap();
        solver
            .apply_event(
                &mut h,
                &EventPayload::ExternalSignal {
                    channel: "vs".into(),
                    value: 4.0,
                },
            )
            .unwrap();
        let out = solver.advance(&mut h, 0.0, 1e-4).unwrap();
        assert!((out.get("n2.re").unwrap() - 2.0).abs() < 1e-12);

        let err = solver
            .apply_event(
                &mut h,
                &EventPayload::ExternalSignal {
                    channel: "r1".into(),
                    value: 4.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidValue { .. }));
        // Unrelated channels are ignored.
        assert!(
            solver
                .apply_event(
                    &mut h,
                    &EventPayload::ExternalSignal {
                        channel: "other".into(),
                        value: 1.0,
                    },
                )
                .is_ok()
        );
    }

    #[test]
    fn unknown_entity_parameter_rejected() {
        let mut solver = MnaSolver::new();
        let mut h = solver.accept(&divider(Domain::Dp), &config(Domain::Dp)).unwrap();
        let err = solver
            .apply_event(
                &mut h,
                &EventPayload::SetParameter {
                    entity: "nope".into(),
                    parameter: "resistance".into(),
                    value: 1.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, SolverError::UnknownTarget { .. }));
    }

    #[test]
    fn domain_mismatch_is_unsupported() {
        let mut solver = MnaSolver::new();
        let err = solver
            .accept(&divider(Domain::Emt), &config(Domain::Dp))
            .unwrap_err();
        assert!(matches!(err, SolverError::Unsupported { .. }));
        assert_eq!(solver.accepted(), 0);
    }

    #[test]
    fn floating_node_is_singular() {
        let gnd = Node::ground();
        let n1 = Node::new("n1");
        let n2 = Node::new("n2");
        let n3 = Node::new("n3");
        let r1 = Entity::connect(
            ty(Domain::Dp, EntityKind::Resistor),
            "r1",
            &[&n1, &gnd],
            Params::new().with("resistance", 1.0),
        )
        .unwrap();
        let r2 = Entity::connect(
            ty(Domain::Dp, EntityKind::Resistor),
            "r2",
            &[&n2, &n3],
            Params::new().with("resistance", 1.0),
        )
        .unwrap();
        let topo = Topology::new(50.0, vec![gnd, n1, n2, n3], vec![r1, r2]).unwrap();
        let err = MnaSolver::new()
            .accept(&topo, &config(Domain::Dp))
            .unwrap_err();
        assert!(matches!(err, SolverError::Singular { .. }));
    }
}
