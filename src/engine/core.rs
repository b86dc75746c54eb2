// src/engine/core.rs

//! Pure scheduler state machine.
//!
//! [`SchedulerCore`] owns one slot per schedulable project and answers two
//! questions for the async shell in [`super::runtime`]:
//! - when should I wake up next ([`SchedulerCore::next_wakeup`])
//! - what should happen now ([`SchedulerCore::on_tick`])
//!
//! It has no channels, no Tokio types and never reads the clock: the caller
//! passes `now` in. That keeps the overlap guard testable without sleeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::engine::trigger::parse_cron;
use crate::types::SchedulerTimezone;

/// Command produced by the core, executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start the repetition loop for this project on a worker.
    StartLoop(Arc<ProjectConfig>),
    /// A fire came due while the previous loop was still running.
    ReportMissed {
        project: String,
        scheduled_for: DateTime<Utc>,
    },
}

#[derive(Debug)]
struct JobSlot {
    project: Arc<ProjectConfig>,
    schedule: Schedule,
    next_fire: Option<DateTime<Utc>>,
    in_flight: bool,
}

/// Why a project did not get a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    Disabled,
    NoCron,
    InvalidCron(String),
}

#[derive(Debug)]
pub struct SchedulerCore {
    slots: BTreeMap<String, JobSlot>,
    excluded: Vec<(String, Exclusion)>,
    timezone: SchedulerTimezone,
}

impl SchedulerCore {
    /// Register one slot per enabled project with a valid cron expression.
    ///
    /// Projects that cannot be scheduled are recorded in
    /// [`SchedulerCore::excluded`] and logged; they never fail the whole set.
    /// If two projects share a name the later one replaces the earlier.
    pub fn new(projects: &[ProjectConfig], timezone: SchedulerTimezone, now: DateTime<Utc>) -> Self {
        let mut slots = BTreeMap::new();
        let mut excluded = Vec::new();

        for project in projects {
            let exclusion = if !project.enabled {
                Some(Exclusion::Disabled)
            } else {
                match project.schedule.cron.as_deref() {
                    None => Some(Exclusion::NoCron),
                    Some(expr) => match parse_cron(expr) {
                        Ok(schedule) => {
                            let next_fire = timezone.next_after(&schedule, &now);
                            let slot = JobSlot {
                                project: Arc::new(project.clone()),
                                schedule,
                                next_fire,
                                in_flight: false,
                            };
                            if slots.insert(project.name.clone(), slot).is_some() {
                                warn!(project = %project.name, "duplicate job key; later project replaces earlier");
                            }
                            None
                        }
                        Err(e) => Some(Exclusion::InvalidCron(format!("'{expr}': {e}"))),
                    },
                }
            };

            if let Some(reason) = exclusion {
                match &reason {
                    Exclusion::InvalidCron(why) => {
                        warn!(project = %project.name, cron = %why, "invalid cron expression; project not scheduled")
                    }
                    other => debug!(project = %project.name, reason = ?other, "project not scheduled"),
                }
                excluded.push((project.name.clone(), reason));
            }
        }

        Self {
            slots,
            excluded,
            timezone,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn timezone(&self) -> SchedulerTimezone {
        self.timezone
    }

    pub fn job_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|s| s.as_str())
    }

    pub fn project(&self, name: &str) -> Option<&ProjectConfig> {
        self.slots.get(name).map(|s| s.project.as_ref())
    }

    pub fn excluded(&self) -> &[(String, Exclusion)] {
        &self.excluded
    }

    pub fn next_fire_of(&self, name: &str) -> Option<DateTime<Utc>> {
        self.slots.get(name).and_then(|s| s.next_fire)
    }

    pub fn is_in_flight(&self, name: &str) -> bool {
        self.slots.get(name).is_some_and(|s| s.in_flight)
    }

    /// Earliest pending fire time across all slots.
    pub fn next_wakeup(&self) -> Option<DateTime<Utc>> {
        self.slots.values().filter_map(|s| s.next_fire).min()
    }

    /// Fire every slot that is due at `now`.
    ///
    /// A due slot whose previous loop is still in flight produces
    /// `ReportMissed` instead of a second `StartLoop`. Either way the slot
    /// advances past `now`, so several fires missed while the process was
    /// suspended collapse into one.
    pub fn on_tick(&mut self, now: DateTime<Utc>) -> Vec<CoreCommand> {
        let mut commands = Vec::new();

        for (name, slot) in self.slots.iter_mut() {
            let Some(due) = slot.next_fire else {
                continue;
            };
            if due > now {
                continue;
            }

            if slot.in_flight {
                commands.push(CoreCommand::ReportMissed {
                    project: name.clone(),
                    scheduled_for: due,
                });
            } else {
                slot.in_flight = true;
                commands.push(CoreCommand::StartLoop(Arc::clone(&slot.project)));
            }

            slot.next_fire = self.timezone.next_after(&slot.schedule, &now);
            debug!(project = %name, next_fire = ?slot.next_fire, "slot advanced");
        }

        commands
    }

    /// Mark a project's repetition loop as finished, freeing its slot.
    pub fn on_loop_finished(&mut self, name: &str) {
        match self.slots.get_mut(name) {
            Some(slot) => slot.in_flight = false,
            None => warn!(project = %name, "finished loop for unknown job"),
        }
    }
}
