use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use resource_types::{InstallPlan, Resource, ResourceId};
use rustc_hash::FxHashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::install::{prev_path, Installer};
use crate::reporter::{ProgressEvent, ProgressSink};
use crate::InstallError;

/// What happened to one resource of a batch.
#[derive(Debug)]
pub enum InstallOutcome {
    Installed {
        path: PathBuf,
        bytes: u64,
        /// Whether a prior file was parked as `.prev` by this install.
        replaced: bool,
    },
    /// An identical install was already present.
    Skipped,
    Failed {
        error: InstallError,
    },
    /// Not attempted: a required predecessor did not complete.
    BlockedByDependency {
        failed: ResourceId,
    },
    Canceled,
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. } | InstallOutcome::Skipped)
    }
}

/// Per-resource outcomes for a whole batch, in plan order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(ResourceId, InstallOutcome)>,
}

impl BatchReport {
    pub fn outcome(&self, id: &ResourceId) -> Option<&InstallOutcome> {
        self.outcomes
            .iter()
            .find(|(outcome_id, _)| outcome_id == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn installed(&self) -> usize {
        self.count(|outcome| matches!(outcome, InstallOutcome::Installed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, InstallOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, InstallOutcome::Failed { .. }))
    }

    pub fn blocked(&self) -> usize {
        self.count(|outcome| matches!(outcome, InstallOutcome::BlockedByDependency { .. }))
    }

    pub fn canceled(&self) -> usize {
        self.count(|outcome| matches!(outcome, InstallOutcome::Canceled))
    }

    /// Whether every resource either installed or was already present.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_success())
    }

    fn count(&self, predicate: impl Fn(&InstallOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

impl Installer {
    /// Execute `plan` with bounded parallelism.
    ///
    /// A resource starts only once every `required` predecessor in the plan
    /// has completed successfully; independent resources run concurrently up
    /// to `parallelism`. A failure marks all transitive dependents
    /// `BlockedByDependency` without stopping the rest of the batch. On a
    /// fully successful batch the parked `.prev` files are cleaned up;
    /// otherwise they are kept so the caller can roll back.
    pub async fn batch_install(
        &self,
        plan: &InstallPlan,
        resources: &FxHashMap<ResourceId, Arc<Resource>>,
        parallelism: usize,
        force: bool,
        sink: Option<Arc<dyn ProgressSink>>,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, InstallError> {
        let n = plan.len();
        let items: Vec<Arc<Resource>> = plan
            .ids()
            .map(|id| {
                resources
                    .get(id)
                    .cloned()
                    .ok_or_else(|| InstallError::UnknownResource { id: id.clone() })
            })
            .collect::<Result<_, _>>()?;
        let position: FxHashMap<&ResourceId, usize> = plan
            .ids()
            .enumerate()
            .map(|(index, id)| (id, index))
            .collect();

        // Gating edges: required dependencies within the plan.
        let mut deps_remaining = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (v, resource) in items.iter().enumerate() {
            if let Some(dependencies) = &resource.dependencies {
                for dep in &dependencies.required {
                    if let Some(&u) = position.get(dep) {
                        deps_remaining[v] += 1;
                        dependents[u].push(v);
                    }
                }
            }
        }

        let parallelism = parallelism.max(1);
        let mut outcomes: Vec<Option<InstallOutcome>> = (0..n).map(|_| None).collect();
        let mut ready: BinaryHeap<Reverse<(ResourceId, usize)>> = (0..n)
            .filter(|&v| deps_remaining[v] == 0)
            .map(|v| Reverse((items[v].id.clone(), v)))
            .collect();
        let mut running = FuturesUnordered::new();

        loop {
            while running.len() < parallelism {
                let Some(Reverse((_, v))) = ready.pop() else {
                    break;
                };
                if cancel.is_cancelled() {
                    outcomes[v] = Some(InstallOutcome::Canceled);
                    continue;
                }
                let resource = Arc::clone(&items[v]);
                let sink = sink.clone();
                running.push(async move {
                    let result = self
                        .install_one(&resource, force, cancel, sink.as_ref())
                        .await;
                    (v, result)
                });
            }

            let Some((v, result)) = running.next().await else {
                break;
            };
            match result {
                Ok(outcome) => {
                    outcomes[v] = Some(outcome);
                    for &u in &dependents[v] {
                        deps_remaining[u] -= 1;
                        if deps_remaining[u] == 0 && outcomes[u].is_none() {
                            ready.push(Reverse((items[u].id.clone(), u)));
                        }
                    }
                }
                Err(err) if err.is_canceled() => {
                    outcomes[v] = Some(InstallOutcome::Canceled);
                }
                Err(err) => {
                    if let Some(sink) = &sink {
                        sink.on_event(ProgressEvent::Failed(
                            items[v].id.clone(),
                            err.to_string(),
                        ));
                    }
                    outcomes[v] = Some(InstallOutcome::Failed { error: err });
                }
            }
        }

        // Entries never scheduled: a required predecessor failed, or the
        // batch was canceled first. The plan is topological, so predecessor
        // outcomes are always finalized before their dependents are visited.
        let mut report = BatchReport::default();
        for (v, item) in items.iter().enumerate() {
            let outcome = match outcomes[v].take() {
                Some(outcome) => outcome,
                None => match blocking_dependency(item, &report) {
                    Some(failed) => InstallOutcome::BlockedByDependency { failed },
                    None => InstallOutcome::Canceled,
                },
            };
            report.outcomes.push((item.id.clone(), outcome));
        }

        if report.is_success() {
            for (_, outcome) in &report.outcomes {
                if let InstallOutcome::Installed {
                    path,
                    replaced: true,
                    ..
                } = outcome
                {
                    let _ = fs_err::remove_file(prev_path(path));
                }
            }
        }

        debug!(
            "Batch finished: {} installed, {} skipped, {} failed, {} blocked, {} canceled",
            report.installed(),
            report.skipped(),
            report.failed(),
            report.blocked(),
            report.canceled()
        );
        Ok(report)
    }
}

/// The root-cause failed dependency of an unscheduled plan entry, if any.
fn blocking_dependency(resource: &Resource, report: &BatchReport) -> Option<ResourceId> {
    let dependencies = resource.dependencies.as_ref()?;
    for dep in &dependencies.required {
        match report.outcome(dep) {
            Some(InstallOutcome::Failed { .. }) => return Some(dep.clone()),
            Some(InstallOutcome::BlockedByDependency { failed }) => return Some(failed.clone()),
            _ => {}
        }
    }
    None
}
