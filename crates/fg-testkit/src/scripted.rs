use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use fg_location::{LocationError, PositionSource};
use fg_schemas::{Coordinate, PositionSample};

/// One scripted read result.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Fix { coordinate: Coordinate, accuracy_meters: f64 },
    Error(LocationError),
    /// Never resolves; lets the provider timeout fire.
    Hang,
}

impl ScriptStep {
    pub fn fix(lat: f64, lon: f64) -> Self {
        ScriptStep::Fix {
            coordinate: Coordinate::new(lat, lon),
            accuracy_meters: 10.0,
        }
    }

    pub fn at(coordinate: Coordinate) -> Self {
        ScriptStep::Fix {
            coordinate,
            accuracy_meters: 10.0,
        }
    }
}

/// Replays steps in order. Once the script runs out every further read
/// reports `PositionUnavailable`.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
    reads: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new<I: IntoIterator<Item = ScriptStep>>(steps: I) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of reads the source has served (cache hits excluded).
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PositionSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn read(&self, _high_accuracy: bool) -> Result<PositionSample, LocationError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().expect("script lock").pop_front();
        match step {
            Some(ScriptStep::Fix {
                coordinate,
                accuracy_meters,
            }) => Ok(PositionSample::new(coordinate, accuracy_meters, Utc::now())),
            Some(ScriptStep::Error(e)) => Err(e),
            Some(ScriptStep::Hang) => std::future::pending().await,
            None => Err(LocationError::PositionUnavailable),
        }
    }
}
