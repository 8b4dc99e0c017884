//! ConfirmAndProcessHandler - Submits a finished wizard in one call.
//!
//! Runs create, plan, confirm and process in order. Each of the first three
//! steps can be abandoned through the cancel signal; once processing starts
//! it runs to completion and reports partial results.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::domain::cancellation::{CancellationError, CancellationWizard};
use crate::domain::foundation::CommandMetadata;

use super::{
    ConfirmCancellationCommand, ConfirmCancellationHandler, CreateCancellationCommand,
    CreateCancellationHandler, ProcessCancellationCommand, ProcessCancellationHandler,
    ProcessCancellationResult, ProgressReporter, UpdateCompensationPlanCommand,
    UpdateCompensationPlanHandler,
};

/// Command carrying the organizer's completed wizard.
#[derive(Debug, Clone)]
pub struct ConfirmAndProcessCommand {
    pub wizard: CancellationWizard,
}

pub struct ConfirmAndProcessHandler {
    create: Arc<CreateCancellationHandler>,
    update_plan: Arc<UpdateCompensationPlanHandler>,
    confirm: Arc<ConfirmCancellationHandler>,
    process: Arc<ProcessCancellationHandler>,
}

impl ConfirmAndProcessHandler {
    pub fn new(
        create: Arc<CreateCancellationHandler>,
        update_plan: Arc<UpdateCompensationPlanHandler>,
        confirm: Arc<ConfirmCancellationHandler>,
        process: Arc<ProcessCancellationHandler>,
    ) -> Self {
        Self {
            create,
            update_plan,
            confirm,
            process,
        }
    }

    /// # Errors
    ///
    /// - whatever the wizard's confirm step still lacks
    /// - `OperationCancelled` if `cancel` flips to `true` before processing
    /// - any error of the individual steps
    ///
    /// A cancellation abandoned after step 1 stays `Pending`.
    pub async fn handle(
        &self,
        cmd: ConfirmAndProcessCommand,
        metadata: CommandMetadata,
        progress: ProgressReporter,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<ProcessCancellationResult, CancellationError> {
        let wizard = cmd.wizard;
        wizard.ensure_ready_to_submit()?;
        let reason = wizard.reason.ok_or(CancellationError::MissingReason)?;

        // 1. Create
        let created = guarded(
            &mut cancel,
            self.create.handle(
                CreateCancellationCommand {
                    event_id: wizard.event_id,
                    reason,
                    reason_note: wizard.reason_note.clone(),
                },
                metadata.clone(),
            ),
        )
        .await?;
        let cancellation_id = created.id;

        // 2. Attach plan
        guarded(
            &mut cancel,
            self.update_plan.handle(
                UpdateCompensationPlanCommand {
                    cancellation_id,
                    request: wizard.compensation.clone(),
                },
                metadata.clone(),
            ),
        )
        .await?;

        // 3. Confirm
        guarded(
            &mut cancel,
            self.confirm.handle(
                ConfirmCancellationCommand {
                    cancellation_id,
                    confirmation_code: wizard.confirmation_text.clone(),
                },
                metadata.clone(),
            ),
        )
        .await?;

        // 4. Process; not cancellable from here on
        if *cancel.borrow() {
            tracing::info!(cancellation_id = %cancellation_id, "Cancel requested after confirmation; processing anyway");
        }
        self.process
            .handle(
                ProcessCancellationCommand { cancellation_id },
                metadata,
                progress,
            )
            .await
    }
}

/// Runs `step` unless the cancel signal is (or becomes) set first.
async fn guarded<T>(
    cancel: &mut watch::Receiver<bool>,
    step: impl Future<Output = Result<T, CancellationError>>,
) -> Result<T, CancellationError> {
    if *cancel.borrow_and_update() {
        return Err(CancellationError::OperationCancelled);
    }
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(CancellationError::OperationCancelled),
        result = step => result,
    }
}

/// Resolves once the signal is `true`; never if the sender goes away.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}
