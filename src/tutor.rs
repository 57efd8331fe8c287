//! The request pipeline: validate, build the prompt, dispatch.

use crate::backend::{BackendResponse, Dispatcher};
use crate::curriculum::CurriculumMap;
use crate::error::Result;
use crate::progress::ProgressStore;
use crate::prompt::{self, Request, RequestKind};
use crate::session::SessionContext;
use std::sync::Arc;

pub struct Tutor {
    curriculum: Arc<CurriculumMap>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<ProgressStore>,
}

impl Tutor {
    pub fn new(
        curriculum: Arc<CurriculumMap>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<ProgressStore>,
    ) -> Self {
        Self {
            curriculum,
            dispatcher,
            store,
        }
    }

    pub fn curriculum(&self) -> &CurriculumMap {
        &self.curriculum
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Answer one request; invalid requests fail before anything is sent
    pub async fn ask(&self, session: &SessionContext, mut request: Request) -> Result<BackendResponse> {
        request.validate(&self.curriculum)?;

        if request.kind == RequestKind::LearningAnalysis && request.details.time_spent.is_none() {
            request.details.time_spent = self.logged_time(request.week).await;
        }

        let prompt = prompt::build(&request, &self.curriculum)?;
        tracing::debug!(
            "Built {} prompt for {} at week {} day {} ({} chars)",
            request.kind,
            session.learner,
            request.week,
            request.day,
            prompt.len()
        );

        Ok(self
            .dispatcher
            .dispatch(&prompt, request.kind, session.model())
            .await)
    }

    async fn logged_time(&self, week: u32) -> Option<String> {
        match self.store.total_minutes(week).await {
            Ok(0) => None,
            Ok(minutes) => Some(format_minutes(minutes)),
            Err(e) => {
                tracing::warn!("Could not read logged time for week {}: {}", week, e);
                None
            }
        }
    }
}

fn format_minutes(minutes: u64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} minutes", m),
        (1, 0) => "1 hour".to_string(),
        (h, 0) => format!("{} hours", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}
