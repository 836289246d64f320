// ABOUTME: Scripted layers for engine tests.
// ABOUTME: A shared world records every probe/apply/destroy and holds queued failures.

use async_trait::async_trait;
use layerboot::engine::{ExecutionContext, RetryPolicy};
use layerboot::layers::{Layer, LayerError, LayerSettings, ProbeOutcome, Registry};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
pub struct WorldState {
    /// Layers whose desired state currently holds.
    pub applied: BTreeSet<String>,
    /// `probe:<name>`, `apply:<name>`, `destroy:<name>` in call order.
    pub log: Vec<String>,
    failures: HashMap<String, VecDeque<LayerError>>,
    unknown: BTreeSet<String>,
    delays: HashMap<String, Duration>,
}

#[derive(Clone, Default)]
pub struct World {
    state: Arc<Mutex<WorldState>>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a failure for the next `op` (`apply:<name>` or `destroy:<name>`).
    pub fn fail(&self, op: &str, error: LayerError) {
        self.state
            .lock()
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(error);
    }

    /// Make the layer's probe report `Unknown`.
    pub fn unknown(&self, layer: &str) {
        self.state.lock().unknown.insert(layer.to_string());
    }

    pub fn delay(&self, layer: &str, delay: Duration) {
        self.state.lock().delays.insert(layer.to_string(), delay);
    }

    pub fn mark_applied(&self, layers: &[&str]) {
        let mut state = self.state.lock();
        for layer in layers {
            state.applied.insert(layer.to_string());
        }
    }

    pub fn is_applied(&self, layer: &str) -> bool {
        self.state.lock().applied.contains(layer)
    }

    pub fn log(&self) -> Vec<String> {
        self.state.lock().log.clone()
    }

    /// Logged entries with the given prefix, prefix stripped.
    pub fn calls(&self, prefix: &str) -> Vec<String> {
        let prefix = format!("{prefix}:");
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }

    fn enter(&self, op: String) -> (Result<(), LayerError>, Duration) {
        let mut state = self.state.lock();
        state.log.push(op.clone());
        let result = match state.failures.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        };
        let layer = op.split_once(':').map(|(_, l)| l).unwrap_or_default();
        let delay = state.delays.get(layer).copied().unwrap_or_default();
        (result, delay)
    }
}

pub struct ScriptedLayer {
    name: String,
    ordinal: u32,
    after: Vec<String>,
    world: World,
}

impl ScriptedLayer {
    pub fn new(world: &World, name: &str, ordinal: u32, after: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            ordinal,
            after: after.iter().map(|s| s.to_string()).collect(),
            world: world.clone(),
        }
    }
}

/// A linear chain `names[0] <- names[1] <- ...` of scripted layers.
pub fn chain(world: &World, names: &[&str]) -> Registry {
    let layers: Vec<Box<dyn Layer>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let after: Vec<&str> = if i == 0 { vec![] } else { vec![names[i - 1]] };
            Box::new(ScriptedLayer::new(world, name, i as u32 + 1, &after)) as Box<dyn Layer>
        })
        .collect();
    Registry::new(layers).expect("chain is acyclic")
}

#[async_trait]
impl Layer for ScriptedLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn predecessors(&self) -> Vec<&str> {
        self.after.iter().map(String::as_str).collect()
    }

    fn settings(&self) -> LayerSettings {
        LayerSettings {
            timeout: Duration::from_secs(5),
            retry: RetryPolicy {
                max_attempts: 3,
                backoff_base: Duration::from_millis(1),
                backoff_max: Duration::from_millis(5),
            },
        }
    }

    async fn probe(&self, _ctx: &ExecutionContext) -> ProbeOutcome {
        self.world.state.lock().log.push(format!("probe:{}", self.name));
        let state = self.world.state.lock();
        if state.unknown.contains(&self.name) {
            ProbeOutcome::Unknown
        } else if state.applied.contains(&self.name) {
            ProbeOutcome::Satisfied
        } else {
            ProbeOutcome::Unsatisfied
        }
    }

    async fn apply(&self, _ctx: &ExecutionContext) -> Result<(), LayerError> {
        let (result, delay) = self.world.enter(format!("apply:{}", self.name));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result?;
        self.world.state.lock().applied.insert(self.name.clone());
        Ok(())
    }

    async fn destroy(&self, _ctx: &ExecutionContext) -> Result<(), LayerError> {
        let (result, _) = self.world.enter(format!("destroy:{}", self.name));
        result?;
        self.world.state.lock().applied.remove(&self.name);
        Ok(())
    }
}
