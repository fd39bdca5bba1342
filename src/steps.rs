// The four interactive steps. Each one prompts, talks to the API and returns
// the next step together with whatever it adds to the session context.

use crate::api::{AssistantsApi, CreateAssistantRequest, CreateMessageRequest, ListQuery, Role};
use crate::error::CliError;
use crate::run;
use crate::session::{Context, SessionSettings, Step, StepOutcome};
use crate::ui::Prompter;
use std::collections::BTreeMap;
use tracing::info;

pub const CREATE_NEW: &str = "Create new";

/// List assistants and let the user pick one or ask for a new one.
pub fn initial<A, P>(api: &A, prompter: &P) -> Result<StepOutcome, CliError>
where
    A: AssistantsApi + ?Sized,
    P: Prompter + ?Sized,
{
    let assistants = api.list_assistants(&ListQuery::newest(None))?;
    let mut items = vec![CREATE_NEW.to_string()];
    items.extend(assistants.iter().map(|a| {
        format!(
            "{} ({})",
            a.name.as_deref().unwrap_or("(unnamed)"),
            a.model
        )
    }));

    let outcome = match prompter.select("Select assistant", &items)? {
        None => StepOutcome::finish(),
        Some(0) => StepOutcome::goto(Step::CreateAssistant),
        Some(i) => match assistants.into_iter().nth(i - 1) {
            Some(assistant) => StepOutcome::goto(Step::CreateThread).with_assistant(assistant.id),
            None => StepOutcome::goto(Step::Initial),
        },
    };
    Ok(outcome)
}

/// Ask for model, name, instructions and description, then create the
/// assistant. Always returns to `initial` so the new assistant gets listed.
pub fn create_assistant<A, P>(api: &A, prompter: &P, ctx: &Context) -> Result<StepOutcome, CliError>
where
    A: AssistantsApi + ?Sized,
    P: Prompter + ?Sized,
{
    if ctx.catalog.is_empty() {
        return Err(CliError::EmptyCatalog);
    }
    let models: Vec<(&str, &str)> = ctx.catalog.iter().collect();
    let items: Vec<String> = models
        .iter()
        .map(|(id, vendor)| format!("{} ({})", id, vendor))
        .collect();

    let Some(index) = prompter.fuzzy_select("Your assistant model", &items)? else {
        return Ok(StepOutcome::goto(Step::Initial));
    };
    let model = models[index].0.to_string();
    let name = prompter.text("Your assistant name")?;
    let instructions = prompter.text("Your assistant instructions")?;
    let description = prompter.text("Your assistant description")?;

    let assistant = api.create_assistant(&CreateAssistantRequest {
        model,
        name,
        instructions,
        description,
    })?;
    info!(assistant_id = %assistant.id, model = %assistant.model, "assistant created");

    Ok(StepOutcome::goto(Step::Initial))
}

/// Open a fresh, empty thread for the selected assistant.
pub fn create_thread<A>(api: &A) -> Result<StepOutcome, CliError>
where
    A: AssistantsApi + ?Sized,
{
    let thread = api.create_thread()?;
    info!(thread_id = %thread.id, "thread created");
    Ok(StepOutcome::goto(Step::RunThread).with_thread(thread))
}

/// Send one user message, run the assistant on the thread and print its
/// newest message. Loops on itself.
pub fn run_thread<A, P>(
    api: &A,
    prompter: &P,
    settings: &SessionSettings,
    ctx: &Context,
) -> Result<StepOutcome, CliError>
where
    A: AssistantsApi + ?Sized,
    P: Prompter + ?Sized,
{
    let assistant_id = ctx
        .assistant_id
        .as_deref()
        .ok_or(CliError::MissingContext("assistant"))?;
    let thread = ctx.thread.as_ref().ok_or(CliError::MissingContext("thread"))?;

    let text = prompter.text("Message")?;
    let mut metadata = BTreeMap::new();
    metadata.insert("userId".to_string(), settings.user_id.clone());
    api.create_message(
        &thread.id,
        &CreateMessageRequest {
            role: Role::User,
            content: text,
            metadata,
        },
    )?;

    prompter.begin_wait("Waiting for the assistant");
    let finished = run::create_and_poll(api, &thread.id, assistant_id, &settings.poll, || {
        prompter.cancel_requested()
    });
    prompter.end_wait();
    finished?;

    let messages = api.list_messages(&thread.id, &ListQuery::newest(Some(1)))?;
    let reply = messages
        .first()
        .and_then(|m| m.first_text())
        .ok_or(CliError::NoTextReply)?;
    prompter.say("Assistant", reply);

    Ok(StepOutcome::goto(Step::RunThread))
}
