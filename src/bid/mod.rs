//! Bid tracker - opportunities, journeys, tasks and notifications
//!
//! Owns the [`BidState`] record and writes it through to the
//! `jusgrantwriter_v7_final` slot after every mutation.

use crate::error::WorkflowError;
use crate::models::bid::{
    BidStage, BidState, Journey, JourneyStatus, Notification, NotificationKind, Opportunity,
    OpportunitySource, Priority, Task, TaskStatus,
};
use crate::state::{Store, BID_KEY, LOG_CAPACITY};
use anyhow::{Context, Result};
use chrono::{Local, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

/// Fields supplied by the user when tracking a new opportunity
#[derive(Debug, Clone)]
pub struct NewOpportunity {
    pub source: OpportunitySource,
    pub notice_id: String,
    pub title: String,
    pub agency: String,
    pub due_date: String,
    pub description: String,
    pub bid_stage: BidStage,
    pub estimated_award: f64,
    pub naics: Option<String>,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct BidTracker {
    store: Store,
    state: BidState,
}

impl BidTracker {
    pub fn load(store: Store) -> Self {
        let state = store.load_or_default(BID_KEY);
        Self { store, state }
    }

    pub fn state(&self) -> &BidState {
        &self.state
    }

    fn save(&self) -> Result<()> {
        self.store
            .save(BID_KEY, &self.state)
            .context("Failed to save bid tracker state")
    }

    fn push_log(&mut self, message: &str) {
        let line = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        self.state.logs.push(line);
        let overflow = self.state.logs.len().saturating_sub(LOG_CAPACITY);
        if overflow > 0 {
            self.state.logs.drain(..overflow);
        }
    }

    /// Append an activity line and persist
    pub fn log(&mut self, message: &str) -> Result<()> {
        self.push_log(message);
        self.save()
    }

    pub fn add_opportunity(&mut self, new: NewOpportunity) -> Result<Opportunity> {
        let opportunity = Opportunity {
            id: new_id(),
            source: new.source,
            notice_id: new.notice_id,
            title: new.title,
            agency: new.agency,
            due_date: new.due_date,
            description: new.description,
            bid_stage: new.bid_stage,
            estimated_award: new.estimated_award,
            naics: new.naics,
        };
        self.state.opportunities.push(opportunity.clone());
        self.push_log(&format!("Tracking opportunity: {}", opportunity.title));
        self.save()?;

        info!(id = %opportunity.id, notice = %opportunity.notice_id, "opportunity added");
        Ok(opportunity)
    }

    pub fn opportunity(&self, id: &str) -> Option<&Opportunity> {
        self.state.opportunities.iter().find(|o| o.id == id)
    }

    /// Open the journey for an opportunity, or return the one already open
    pub fn start_journey(&mut self, opportunity_id: &str) -> Result<Journey> {
        if self.opportunity(opportunity_id).is_none() {
            return Err(WorkflowError::NotFound {
                kind: "opportunity",
                id: opportunity_id.to_string(),
            }
            .into());
        }

        let journey = match self
            .state
            .journeys
            .iter()
            .find(|j| j.opportunity_id == opportunity_id)
        {
            Some(existing) => existing.clone(),
            None => {
                let journey = Journey {
                    id: new_id(),
                    opportunity_id: opportunity_id.to_string(),
                    status: JourneyStatus::InProgress,
                    created_at: timestamp(),
                };
                self.state.journeys.push(journey.clone());
                self.push_log("Journey started.");
                journey
            }
        };

        self.state.active_opportunity_id = Some(opportunity_id.to_string());
        self.state.active_journey_id = Some(journey.id.clone());
        self.save()?;
        Ok(journey)
    }

    pub fn set_journey_status(&mut self, journey_id: &str, status: JourneyStatus) -> Result<()> {
        let journey = self
            .state
            .journeys
            .iter_mut()
            .find(|j| j.id == journey_id)
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "journey",
                id: journey_id.to_string(),
            })?;
        journey.status = status;
        self.save()
    }

    pub fn add_task(
        &mut self,
        journey_id: &str,
        title: &str,
        priority: Priority,
        deadline: &str,
    ) -> Result<Task> {
        if !self.state.journeys.iter().any(|j| j.id == journey_id) {
            return Err(WorkflowError::NotFound {
                kind: "journey",
                id: journey_id.to_string(),
            }
            .into());
        }

        let task = Task {
            id: new_id(),
            journey_id: journey_id.to_string(),
            title: title.to_string(),
            priority,
            deadline: deadline.to_string(),
            status: TaskStatus::ToDo,
        };
        self.state.tasks.push(task.clone());
        self.save()?;
        Ok(task)
    }

    pub fn set_task_status(&mut self, task_id: &str, status: TaskStatus) -> Result<()> {
        let task = self
            .state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| WorkflowError::NotFound {
                kind: "task",
                id: task_id.to_string(),
            })?;
        task.status = status;
        self.save()
    }

    pub fn tasks_for(&self, journey_id: &str) -> Vec<&Task> {
        self.state
            .tasks
            .iter()
            .filter(|t| t.journey_id == journey_id)
            .collect()
    }

    pub fn notify(&mut self, kind: NotificationKind, title: &str, message: &str) -> Result<Notification> {
        let notification = Notification {
            id: new_id(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            timestamp: timestamp(),
            read: false,
        };
        self.state.notifications.push(notification.clone());
        self.save()?;
        Ok(notification)
    }

    pub fn mark_all_read(&mut self) -> Result<()> {
        for n in &mut self.state.notifications {
            n.read = true;
        }
        self.save()
    }

    pub fn unread_count(&self) -> usize {
        self.state.notifications.iter().filter(|n| !n.read).count()
    }
}
