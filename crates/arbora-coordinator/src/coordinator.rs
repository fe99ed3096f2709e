//! The turn coordinator
//!
//! Owns one record and its job context for the lifetime of a job and turns
//! each operator utterance into exactly one [`TurnResult`] and one turn log
//! entry. Control flow per turn: context guard, intent decision, then either
//! segmentation/extraction/merge or service routing. Failures never
//! propagate past the turn boundary.

use crate::error::TurnError;
use crate::registry::ExtractorRegistry;
use crate::segment::{segment, Segment};
use crate::turn::{ErrorDetail, SegmentNote, TurnResult, TurnRoute};
use crate::turn_log::TurnLog;
use arbora_domain::{
    BackstopClassifier, Intent, IntentClassifier, JobContext, MergeOrigin, MergePolicy,
    ProvenanceRow, Record, Section, SectionExtractor, ServiceKind,
};
use arbora_guard::{ContextGuard, GuardDecision};
use arbora_router::ServiceRouter;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use uuid::Uuid;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn new_turn_id() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    format!("turn-{}", &hex[..12])
}

/// One coordinator per record; single-threaded per job
pub struct Coordinator<I: IntentClassifier, B: BackstopClassifier> {
    context: JobContext,
    record: Record,
    intent: I,
    registry: ExtractorRegistry,
    corrections: Arc<dyn SectionExtractor>,
    router: ServiceRouter<B>,
    guard: ContextGuard,
    log: TurnLog,
}

impl<I: IntentClassifier, B: BackstopClassifier> Coordinator<I, B> {
    /// Wire a coordinator for one job; the record starts empty
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: JobContext,
        intent: I,
        registry: ExtractorRegistry,
        corrections: Arc<dyn SectionExtractor>,
        router: ServiceRouter<B>,
        guard: ContextGuard,
        log: TurnLog,
    ) -> Coordinator<I, B> {
        Coordinator {
            context,
            record: Record::new(),
            intent,
            registry,
            corrections,
            router,
            guard,
            log,
        }
    }

    /// The canonical record, only readable from outside
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// The read-only job context
    pub fn context(&self) -> &JobContext {
        &self.context
    }

    /// Handle one operator turn
    ///
    /// Never panics and never returns an error: failures are embedded in the
    /// result. Every turn, success or failure, appends exactly one log entry.
    pub fn handle_turn(&mut self, utterance: &str) -> TurnResult {
        let turn_id = new_turn_id();
        info!(%turn_id, "handling turn");

        let result = match self.process(&turn_id, utterance) {
            Ok(result) => result,
            Err(e) => {
                warn!(%turn_id, error = %e, "turn failed");
                let mut result = TurnResult::new(&turn_id, utterance);
                result.ok = false;
                result.route = TurnRoute::Error;
                result.error = Some(ErrorDetail {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                result
            }
        };

        if let Err(e) = self.log.append(unix_now(), &result) {
            warn!(%turn_id, error = %e, "failed to append turn log entry");
        }
        result
    }

    fn process(&mut self, turn_id: &str, utterance: &str) -> Result<TurnResult, TurnError> {
        // the guard runs before intent classification and cannot be bypassed
        if let GuardDecision::Blocked { phrase, note } = self.guard.check(utterance) {
            debug!(%phrase, "context edit blocked");
            let mut result = TurnResult::new(turn_id, utterance);
            result.route = TurnRoute::BlockedContextEdit;
            result.note = Some(note);
            return Ok(result);
        }

        let intent = self
            .intent
            .classify(utterance)
            .map_err(TurnError::Classification)?;
        debug!(?intent, "intent classified");

        match intent {
            Intent::ProvideStatement => Ok(self.provide_statement(turn_id, utterance)),
            Intent::RequestService => self.request_service(turn_id, utterance),
        }
    }

    fn provide_statement(&mut self, turn_id: &str, utterance: &str) -> TurnResult {
        let mut result = TurnResult::new(turn_id, utterance);
        result.route = TurnRoute::ProvideStatement;

        let parsed = segment(utterance, self.record.cursor);
        self.record.cursor = parsed.next_cursor;

        if let Some(discarded) = &parsed.discarded {
            result.note = Some(format!(
                "unscoped text ignored (no active section): \"{}\"",
                discarded
            ));
        }

        for seg in &parsed.segments {
            if seg.is_navigation_only() {
                debug!(section = %seg.section, "navigation-only segment");
                result.segments.push(SegmentNote {
                    section: seg.section,
                    payload: String::new(),
                    navigation_only: true,
                    captured: false,
                });
                continue;
            }

            match self.capture_segment(turn_id, seg) {
                Ok((paths, rows)) => {
                    result.segments.push(SegmentNote {
                        section: seg.section,
                        payload: seg.payload.clone(),
                        navigation_only: false,
                        captured: !paths.is_empty(),
                    });
                    result.applied_paths.extend(paths);
                    result.rows.extend(rows);
                }
                Err(e) => {
                    // atomic per segment: earlier merges stand, this one did
                    // nothing, the rest of the turn is abandoned
                    warn!(section = %seg.section, error = %e, "segment capture failed");
                    result.segments.push(SegmentNote {
                        section: seg.section,
                        payload: seg.payload.clone(),
                        navigation_only: false,
                        captured: false,
                    });
                    result.ok = false;
                    result.route = TurnRoute::Error;
                    result.error = Some(ErrorDetail {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                    return result;
                }
            }
        }

        if result.applied_paths.is_empty() && result.note.is_none() {
            result.note = Some("no_capture".to_string());
        }
        result
    }

    fn capture_segment(
        &mut self,
        turn_id: &str,
        seg: &Segment,
    ) -> Result<(Vec<String>, Vec<ProvenanceRow>), TurnError> {
        let extractor = self.registry.get(seg.section)?;
        let envelope = extractor
            .extract(seg.section, &seg.payload)
            .map_err(|message| TurnError::Extraction {
                section: seg.section,
                message,
            })?
            .sanitized();

        let origin = MergeOrigin {
            turn_id: turn_id.to_string(),
            segment_text: seg.payload.clone(),
            extractor: extractor.name().to_string(),
            timestamp: unix_now(),
        };
        let outcome = self
            .record
            .merge(seg.section, &envelope, MergePolicy::PreferExisting, &origin)?;
        self.record = outcome.record;
        Ok((outcome.applied_paths, outcome.rows))
    }

    fn request_service(&mut self, turn_id: &str, utterance: &str) -> Result<TurnResult, TurnError> {
        let decision = self.router.route(utterance)?;
        debug!(service = %decision.service, "service routed");

        let mut result = TurnResult::new(turn_id, utterance);
        result.route = TurnRoute::RequestService;

        match (decision.service, decision.section) {
            (ServiceKind::Clarify, _) => {
                result.route = TurnRoute::Clarify;
                result.note = decision.note.clone();
            }
            (ServiceKind::MakeCorrection, Some(section)) => {
                let (paths, rows) = self.apply_correction(turn_id, section, utterance)?;
                if paths.is_empty() {
                    result.note = Some("correction captured nothing".to_string());
                }
                result.applied_paths = paths;
                result.rows = rows;
            }
            (ServiceKind::MakeCorrection, None) => {
                result.route = TurnRoute::Clarify;
                result.note = Some("which section should the correction apply to?".to_string());
            }
            (ServiceKind::SectionSummary, None) => {
                result.route = TurnRoute::Clarify;
                result.note = Some("which section should be summarized?".to_string());
            }
            // summary, outline, and draft rendering are external; the
            // routing decision itself is the result of these turns
            _ => {}
        }

        result.routing = Some(decision);
        Ok(result)
    }

    fn apply_correction(
        &mut self,
        turn_id: &str,
        section: Section,
        utterance: &str,
    ) -> Result<(Vec<String>, Vec<ProvenanceRow>), TurnError> {
        let envelope = self
            .corrections
            .extract(section, utterance)
            .map_err(|message| TurnError::Extraction { section, message })?
            .sanitized();

        let origin = MergeOrigin {
            turn_id: turn_id.to_string(),
            segment_text: utterance.to_string(),
            extractor: self.corrections.name().to_string(),
            timestamp: unix_now(),
        };
        let outcome = self
            .record
            .merge(section, &envelope, MergePolicy::LastWrite, &origin)?;
        self.record = outcome.record;
        Ok((outcome.applied_paths, outcome.rows))
    }
}
