//! Simulation driver: run lifecycle, stepping and event application.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dp_results::{NullSink, ResultSink};
use dp_topology::Topology;
use tracing::{debug, error, info, info_span, warn};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::event::{Event, EventPayload};
use crate::queue::{EventQueue, EventSender};
use crate::solver::Solver;

/// Relative slack when deciding whether an event is due at a step boundary.
const DUE_TOLERANCE: f64 = 1e-9;

/// Lifecycle state of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Created,
    Initialized,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Completed, Failed and Cancelled runs cannot be resumed.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Created => "created",
            RunState::Initialized => "initialized",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic kept by a failed run.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    /// Index of the step that failed (0-based).
    pub step: u64,
    /// Simulated time at the start of that step.
    pub time: f64,
    pub error: SimError,
}

/// Cooperative cancellation flag, checked at every timestep boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Progress snapshot passed to [`Simulation::run_with_progress`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimProgress {
    pub step: u64,
    pub total_steps: u64,
    pub time: f64,
    pub duration: f64,
}

impl SimProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.total_steps == 0 {
            1.0
        } else {
            self.step as f64 / self.total_steps as f64
        }
    }
}

/// Drives a [`Solver`] through a fixed-step run over one or more topologies.
///
/// The first topology is active at start; alternates registered with
/// [`add_topology`](Simulation::add_topology) become active through
/// [`EventPayload::SwitchTopology`] events.
pub struct Simulation<S: Solver, K: ResultSink = NullSink> {
    name: String,
    config: SimulationConfig,
    topologies: Vec<Topology>,
    solver: S,
    handles: Vec<S::Handle>,
    active: usize,
    sink: K,
    queue: EventQueue,
    cancel: CancelToken,
    state: RunState,
    history: Vec<RunState>,
    total_steps: u64,
    exact: bool,
    steps_taken: u64,
    time: f64,
    failure: Option<Failure>,
}

impl<S: Solver> Simulation<S> {
    pub fn new(
        name: impl Into<String>,
        topology: Topology,
        config: SimulationConfig,
        solver: S,
    ) -> SimResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SimError::InvalidConfig {
                what: "simulation name must not be empty".to_string(),
            });
        }
        config.validate()?;
        let (total_steps, exact) = config.steps();
        Ok(Self {
            name,
            config,
            topologies: vec![topology],
            solver,
            handles: Vec::new(),
            active: 0,
            sink: NullSink,
            queue: EventQueue::new(),
            cancel: CancelToken::new(),
            state: RunState::Created,
            history: vec![RunState::Created],
            total_steps,
            exact,
            steps_taken: 0,
            time: 0.0,
            failure: None,
        })
    }
}

impl<S: Solver, K: ResultSink> Simulation<S, K> {
    /// Replace the result sink. Only meaningful before the run starts.
    pub fn with_sink<K2: ResultSink>(self, sink: K2) -> Simulation<S, K2> {
        Simulation {
            name: self.name,
            config: self.config,
            topologies: self.topologies,
            solver: self.solver,
            handles: self.handles,
            active: self.active,
            sink,
            queue: self.queue,
            cancel: self.cancel,
            state: self.state,
            history: self.history,
            total_steps: self.total_steps,
            exact: self.exact,
            steps_taken: self.steps_taken,
            time: self.time,
            failure: self.failure,
        }
    }

    /// Replace the event queue, e.g. with a bounded one.
    pub fn with_queue(mut self, queue: EventQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Register an alternate topology and return its index.
    pub fn add_topology(&mut self, topology: Topology) -> SimResult<usize> {
        if self.state != RunState::Created {
            return Err(SimError::InvalidState {
                state: self.state,
                what: "topologies can only be added before initialization",
            });
        }
        self.topologies.push(topology);
        Ok(self.topologies.len() - 1)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn topologies(&self) -> &[Topology] {
        &self.topologies
    }

    /// Topology the solver is currently advancing.
    pub fn active_topology(&self) -> &Topology {
        &self.topologies[self.active]
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state the run has been in, starting with `Created`.
    pub fn state_history(&self) -> &[RunState] {
        &self.history
    }

    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Simulated time reached so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Producer handle for injecting events from other threads.
    pub fn event_sender(&self) -> EventSender {
        self.queue.sender()
    }

    /// Enqueue an event from the owning thread.
    pub fn schedule(&self, event: Event) -> SimResult<()> {
        Ok(self.queue.enqueue(event)?)
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: RunState) {
        info!(sim = %self.name, from = %self.state, to = %next, "run state changed");
        self.state = next;
        self.history.push(next);
        if next.is_terminal() {
            self.queue.close();
            if let Err(e) = self.sink.finish() {
                warn!(sim = %self.name, error = %e, "result sink failed to finish");
            }
        }
    }

    fn fail(&mut self, step: u64, time: f64, error: SimError) -> SimError {
        error!(sim = %self.name, step, time, error = %error, "run failed");
        self.time = time;
        self.failure = Some(Failure {
            step,
            time,
            error: error.clone(),
        });
        self.transition(RunState::Failed);
        error
    }

    fn ensure_not_ended(&self) -> SimResult<()> {
        if self.state.is_terminal() {
            return Err(SimError::NotRestartable { state: self.state });
        }
        Ok(())
    }

    /// Hand every registered topology to the solver.
    pub fn initialize(&mut self) -> SimResult<()> {
        self.ensure_not_ended()?;
        if self.state != RunState::Created {
            return Err(SimError::InvalidState {
                state: self.state,
                what: "simulation is already initialized",
            });
        }

        if !self.exact {
            warn!(
                sim = %self.name,
                duration = self.config.duration,
                timestep = self.config.timestep,
                "duration is not a whole number of timesteps; final step is shortened"
            );
        }

        let mut handles = Vec::with_capacity(self.topologies.len());
        for (index, topology) in self.topologies.iter().enumerate() {
            match self.solver.accept(topology, &self.config) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let err = SimError::SolverInit {
                        index,
                        message: e.to_string(),
                    };
                    return Err(self.fail(0, 0.0, err));
                }
            }
        }
        self.handles = handles;

        if let Err(e) = self.sink.begin(&self.name) {
            return Err(self.fail(0, 0.0, e.into()));
        }

        self.transition(RunState::Initialized);
        Ok(())
    }

    fn check_event(&self, event: &Event) -> Result<(), String> {
        match &event.payload {
            EventPayload::SetParameter {
                entity,
                parameter,
                value,
            } => {
                let target = self.topologies[self.active]
                    .entity(entity)
                    .ok_or_else(|| format!("unknown entity '{entity}'"))?;
                target
                    .kind()
                    .check_parameter(parameter, *value)
                    .map_err(|e| e.to_string())
            }
            EventPayload::ExternalSignal { channel, value } => {
                if channel.is_empty() {
                    return Err("signal channel must not be empty".to_string());
                }
                if !value.is_finite() {
                    return Err(format!("signal value must be finite, got {value}"));
                }
                Ok(())
            }
            EventPayload::SwitchTopology { index } => {
                if *index >= self.topologies.len() {
                    return Err(format!(
                        "topology index {index} out of range ({} registered)",
                        self.topologies.len()
                    ));
                }
                Ok(())
            }
        }
    }

    fn apply_event(&mut self, event: &Event) -> Result<(), String> {
        self.check_event(event)?;
        debug!(sim = %self.name, t = event.time, event = %event.payload, "applying event");
        match &event.payload {
            EventPayload::SwitchTopology { index } => {
                let (from, to) = (self.active, *index);
                if from != to {
                    let (source, target) = handle_pair(&mut self.handles, from, to);
                    self.solver
                        .switch_from(source, target)
                        .map_err(|e| e.to_string())?;
                    self.active = to;
                }
                Ok(())
            }
            payload => self
                .solver
                .apply_event(&mut self.handles[self.active], payload)
                .map_err(|e| e.to_string()),
        }
    }

    /// Advance one timestep.
    ///
    /// Returns `Ok(true)` while steps remain and `Ok(false)` once the run has
    /// completed.
    pub fn step(&mut self) -> SimResult<bool> {
        self.ensure_not_ended()?;
        match self.state {
            RunState::Created => {
                return Err(SimError::InvalidState {
                    state: self.state,
                    what: "initialize before stepping",
                });
            }
            RunState::Initialized => self.transition(RunState::Running),
            _ => {}
        }

        let k = self.steps_taken;
        let t = k as f64 * self.config.timestep;

        if self.cancel.is_cancelled() {
            info!(sim = %self.name, step = k, t, "cancellation requested");
            self.time = t;
            self.transition(RunState::Cancelled);
            return Err(SimError::Cancelled { time: t });
        }

        let horizon = t + self.config.timestep * DUE_TOLERANCE;
        for event in self.queue.drain_due(horizon) {
            if let Err(reason) = self.apply_event(&event) {
                let err = SimError::MalformedEvent {
                    time: event.time,
                    reason,
                };
                return Err(self.fail(k, t, err));
            }
        }

        let dt = if k + 1 == self.total_steps && !self.exact {
            self.config.duration - t
        } else {
            self.config.timestep
        };

        let output = match self
            .solver
            .advance(&mut self.handles[self.active], t, dt)
        {
            Ok(output) => output,
            Err(e) => {
                let err = SimError::SolverStep {
                    step: k,
                    time: t,
                    message: e.to_string(),
                };
                return Err(self.fail(k, t, err));
            }
        };

        let t_next = t + dt;
        if let Err(e) = self.sink.record(t_next, &output) {
            return Err(self.fail(k, t, e.into()));
        }

        self.steps_taken = k + 1;
        self.time = t_next;

        if self.steps_taken >= self.total_steps {
            info!(sim = %self.name, steps = self.steps_taken, t = self.time, "run complete");
            self.transition(RunState::Completed);
            return Ok(false);
        }
        Ok(true)
    }

    /// Initialize if needed and step until the run ends.
    pub fn run(&mut self) -> SimResult<()> {
        self.run_inner(None)
    }

    /// Like [`run`](Simulation::run), reporting progress after every step.
    pub fn run_with_progress(&mut self, progress: &mut dyn FnMut(SimProgress)) -> SimResult<()> {
        self.run_inner(Some(progress))
    }

    fn run_inner(&mut self, mut progress: Option<&mut dyn FnMut(SimProgress)>) -> SimResult<()> {
        let span = info_span!("simulation", name = %self.name);
        let _guard = span.enter();

        self.ensure_not_ended()?;
        if self.state == RunState::Created {
            self.initialize()?;
        }
        info!(
            steps = self.total_steps,
            duration = self.config.duration,
            timestep = self.config.timestep,
            domain = %self.config.domain,
            "starting run"
        );

        loop {
            let more = self.step()?;
            if let Some(cb) = progress.as_deref_mut() {
                cb(SimProgress {
                    step: self.steps_taken,
                    total_steps: self.total_steps,
                    time: self.time,
                    duration: self.config.duration,
                });
            }
            if !more {
                return Ok(());
            }
        }
    }
}

/// Shared view of `from` and exclusive view of `to`; the indices differ.
fn handle_pair<H>(handles: &mut [H], from: usize, to: usize) -> (&H, &mut H) {
    if from < to {
        let (lo, hi) = handles.split_at_mut(to);
        (&lo[from], &mut hi[0])
    } else {
        let (lo, hi) = handles.split_at_mut(from);
        (&hi[0], &mut lo[to])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{SolverError, SolverResult};
    use dp_core::{Domain, PhaseGroup};
    use dp_results::{LabeledVector, MemorySink};
    use dp_topology::{Entity, EntityKind, EntityType, Node, Params};

    #[derive(Default)]
    struct CountingSolver {
        advances: Vec<(f64, f64)>,
        applied: Vec<EventPayload>,
    }

    impl Solver for CountingSolver {
        type Handle = usize;

        fn accept(
            &mut self,
            topology: &Topology,
            _config: &SimulationConfig,
        ) -> SolverResult<usize> {
            Ok(topology.entities().len())
        }

        fn advance(&mut self, _h: &mut usize, time: f64, dt: f64) -> SolverResult<LabeledVector> {
            self.advances.push((time, dt));
            Ok(LabeledVector::empty())
        }

        fn apply_event(&mut self, _h: &mut usize, payload: &EventPayload) -> SolverResult<()> {
            self.applied.push(payload.clone());
            Ok(())
        }
    }

    fn resistor_topology() -> Topology {
        let gnd = Node::ground();
        let n1 = Node::new("n1");
        let r = Entity::connect(
            EntityType::new(Domain::Dp, PhaseGroup::Ph1, EntityKind::Resistor),
            "r1",
            &[&n1, &gnd],
            Params::new().with("resistance", 1.0),
        )
        .unwrap();
        Topology::new(50.0, vec![gnd, n1], vec![r]).unwrap()
    }

    fn sim(duration: f64, timestep: f64) -> Simulation<CountingSolver> {
        let config = SimulationConfig::new(duration, timestep, Domain::Dp).unwrap();
        Simulation::new("test", resistor_topology(), config, CountingSolver::default()).unwrap()
    }

    #[test]
    fn single_step_run_history() {
        let mut s = sim(1e-3, 1e-3);
        s.run().unwrap();
        assert_eq!(s.steps_taken(), 1);
        assert_eq!(
            s.state_history(),
            &[
                RunState::Created,
                RunState::Initialized,
                RunState::Running,
                RunState::Completed
            ]
        );
    }

    #[test]
    fn shortened_final_step() {
        let mut s = sim(1.0, 0.3);
        s.run().unwrap();
        let advances = &s.solver().advances;
        assert_eq!(advances.len(), 4);
        let (t_last, dt_last) = advances[3];
        assert!((t_last - 0.9).abs() < 1e-12);
        assert!((dt_last - 0.1).abs() < 1e-12);
        assert!((s.time() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn step_before_initialize_is_invalid_state() {
        let mut s = sim(1.0, 0.1);
        assert!(matches!(s.step(), Err(SimError::InvalidState { .. })));
        assert_eq!(s.state(), RunState::Created);
    }

    #[test]
    fn completed_run_is_not_restartable() {
        let mut s = sim(0.01, 1e-3);
        s.run().unwrap();
        assert_eq!(
            s.run(),
            Err(SimError::NotRestartable {
                state: RunState::Completed
            })
        );
        assert!(matches!(s.step(), Err(SimError::NotRestartable { .. })));
    }

    #[test]
    fn events_applied_once_at_their_step() {
        let mut s = sim(0.01, 1e-3).with_sink(MemorySink::new());
        s.schedule(Event::set_parameter(0.005, "r1", "resistance", 2.0))
            .unwrap();
        s.schedule(Event::signal(0.0, "ext", 1.0)).unwrap();
        s.run().unwrap();
        assert_eq!(s.solver().applied.len(), 2);
        assert!(matches!(
            s.solver().applied[0],
            EventPayload::ExternalSignal { .. }
        ));
        assert_eq!(s.sink().rows.len(), 10);
        assert!(s.sink().finished);
    }

    #[test]
    fn unknown_entity_event_fails_run() {
        let mut s = sim(0.01, 1e-3);
        s.schedule(Event::set_parameter(0.002, "nope", "resistance", 2.0))
            .unwrap();
        let err = s.run().unwrap_err();
        assert!(matches!(err, SimError::MalformedEvent { .. }));
        let failure = s.failure().unwrap();
        assert_eq!(failure.step, 2);
        assert_eq!(s.state(), RunState::Failed);
    }

    #[test]
    fn invalid_parameter_value_is_malformed() {
        let mut s = sim(0.01, 1e-3);
        s.schedule(Event::set_parameter(0.0, "r1", "resistance", -1.0))
            .unwrap();
        assert!(matches!(s.run(), Err(SimError::MalformedEvent { .. })));
    }

    #[test]
    fn cancel_before_run() {
        let mut s = sim(1.0, 1e-3);
        s.cancel_token().cancel();
        assert_eq!(s.run(), Err(SimError::Cancelled { time: 0.0 }));
        assert_eq!(s.state(), RunState::Cancelled);
        assert_eq!(s.steps_taken(), 0);
    }

    #[test]
    fn producers_see_closed_after_run() {
        let mut s = sim(0.002, 1e-3);
        let tx = s.event_sender();
        s.run().unwrap();
        assert_eq!(
            tx.enqueue(Event::signal(0.0, "x", 1.0)),
            Err(crate::queue::QueueError::Closed)
        );
    }

    #[test]
    fn add_topology_after_initialize_rejected() {
        let mut s = sim(0.01, 1e-3);
        s.initialize().unwrap();
        assert!(matches!(
            s.add_topology(resistor_topology()),
            Err(SimError::InvalidState { .. })
        ));
    }

    #[test]
    fn progress_reports_every_step() {
        let mut s = sim(0.005, 1e-3);
        let mut seen = Vec::new();
        s.run_with_progress(&mut |p: SimProgress| seen.push(p.step)).unwrap();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn solver_error_message_is_kept() {
        let e = SolverError::Diverged { time: 0.5 };
        assert!(e.to_string().contains("0.5"));
    }
}
