use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use wizard_flow::{Context, FlowRunner, Graph, GraphBuilder, Result, Session, SessionStorage, Task};

use crate::clients::{Wallet, WalletConnection};
use crate::models::{
    ApplicationDraft, Celebration, FieldView, SubmissionReport, WizardStep, WizardView,
};
use crate::submission::SubmissionServices;
use crate::tasks::{
    EnterDetailsTask, SelectTypeTask, SubmitApplicationTask, UploadDocumentsTask, session_keys,
    utils::{current_step, load_draft},
};

pub fn build_wizard_graph(services: SubmissionServices, celebration: TimeDelta) -> Graph {
    let select_type = Arc::new(SelectTypeTask);
    let select_type_id = select_type.id().to_string();

    let enter_details = Arc::new(EnterDetailsTask);
    let enter_details_id = enter_details.id().to_string();

    let upload_documents = Arc::new(UploadDocumentsTask);
    let upload_documents_id = upload_documents.id().to_string();

    let submit = Arc::new(SubmitApplicationTask::new(services, celebration));
    let submit_id = submit.id().to_string();

    GraphBuilder::new("insurance_application")
        .add_task(select_type)
        .add_task(enter_details)
        .add_task(upload_documents)
        .add_task(submit)
        .add_edge(&select_type_id, &enter_details_id)
        .add_edge(&enter_details_id, &upload_documents_id)
        .add_edge(&upload_documents_id, &submit_id)
        .build()
}

/// Start a wizard session. The wallet is asked for accounts once, here; an
/// unavailable wallet is recorded, not treated as an error.
pub async fn create_wizard_session(wallet: &dyn Wallet) -> Result<Session> {
    let session_id = Uuid::new_v4().to_string();
    let session = Session::new_from_task(session_id.clone(), SelectTypeTask.id());

    let connection = wallet.connect().await;
    if let WalletConnection::Unavailable { reason } = &connection {
        info!(session_id = %session_id, reason = %reason, "wizard started without a wallet");
    }

    let context = &session.context;
    context.set(session_keys::SESSION_ID, &session_id).await?;
    context.set(session_keys::STEP, WizardStep::SelectingType).await?;
    context.set(session_keys::DRAFT, ApplicationDraft::default()).await?;
    context.set(session_keys::WALLET, connection).await?;

    Ok(session)
}

pub fn create_flow_runner(graph: Graph, session_storage: Arc<dyn SessionStorage>) -> FlowRunner {
    FlowRunner::new(Arc::new(graph), session_storage)
}

/// Render the session for a client. `submitting` is true while a run holds
/// the session.
pub async fn wizard_view(session: &Session, submitting: bool) -> WizardView {
    let context: &Context = &session.context;
    let draft = load_draft(context).await;
    let step = current_step(context).await;
    let message = context
        .get::<Option<String>>(session_keys::MESSAGE)
        .await
        .flatten();
    let last_submission: Option<SubmissionReport> =
        context.get(session_keys::LAST_SUBMISSION).await;
    let celebrating = context
        .get::<Celebration>(session_keys::CELEBRATION)
        .await
        .is_some_and(|c| c.is_active(Utc::now()));

    let fields: Vec<FieldView> = draft
        .selection
        .map(|insurance_type| {
            insurance_type
                .field_set()
                .iter()
                .map(|field| FieldView {
                    name: field.name,
                    kind: field.kind,
                    value: draft.values.get(field.name).cloned().unwrap_or_default(),
                })
                .collect()
        })
        .unwrap_or_default();

    WizardView {
        session_id: session.id.clone(),
        step,
        step_number: step.step_number(),
        insurance_type: draft.selection,
        fields,
        attachments: draft
            .attachments
            .iter()
            .enumerate()
            .map(|(index, attachment)| attachment.summary(index))
            .collect(),
        message,
        status_message: session.status_message.clone(),
        can_submit: step == WizardStep::UploadingDocuments
            && !draft.attachments.is_empty()
            && !submitting,
        submitting,
        celebrating,
        last_submission,
        wallet: context.get(session_keys::WALLET).await,
    }
}
