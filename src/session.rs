// Step loop controller. A session is a context value threaded through a
// closed set of steps; each step returns where to go next plus a patch that
// is folded into the context before the next step runs.

use crate::api::{AssistantsApi, Thread, VendorCatalog};
use crate::error::CliError;
use crate::run::PollPolicy;
use crate::steps;
use crate::ui::Prompter;
use std::fmt;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Initial,
    CreateAssistant,
    CreateThread,
    RunThread,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Initial => "initial",
            Step::CreateAssistant => "createAssistant",
            Step::CreateThread => "createThread",
            Step::RunThread => "runThread",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session state shared by the steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    pub catalog: VendorCatalog,
    pub assistant_id: Option<String>,
    pub thread: Option<Thread>,
}

/// Fields a step wants to overwrite. Unset fields leave the context alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextPatch {
    pub assistant_id: Option<String>,
    pub thread: Option<Thread>,
}

impl Context {
    pub fn new(catalog: VendorCatalog) -> Self {
        Context {
            catalog,
            ..Default::default()
        }
    }

    /// Shallow merge: set fields in `patch` win.
    pub fn merge(self, patch: ContextPatch) -> Self {
        Context {
            catalog: self.catalog,
            assistant_id: patch.assistant_id.or(self.assistant_id),
            thread: patch.thread.or(self.thread),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub next: Option<Step>,
    pub patch: ContextPatch,
}

impl StepOutcome {
    pub fn goto(step: Step) -> Self {
        StepOutcome {
            next: Some(step),
            patch: ContextPatch::default(),
        }
    }

    pub fn finish() -> Self {
        StepOutcome {
            next: None,
            patch: ContextPatch::default(),
        }
    }

    pub fn with_assistant(mut self, assistant_id: String) -> Self {
        self.patch.assistant_id = Some(assistant_id);
        self
    }

    pub fn with_thread(mut self, thread: Thread) -> Self {
        self.patch.thread = Some(thread);
        self
    }
}

/// Run `handler` from `start` until a step yields no next step. Recoverable
/// errors are passed to `on_recoverable` and the failing step is re-entered;
/// any other error ends the loop.
pub fn drive<H, R>(
    mut ctx: Context,
    start: Step,
    mut handler: H,
    mut on_recoverable: R,
) -> Result<Context, CliError>
where
    H: FnMut(Step, &Context) -> Result<StepOutcome, CliError>,
    R: FnMut(Step, &CliError),
{
    let mut step = start;
    loop {
        debug!(step = %step, "entering step");
        let outcome = match handler(step, &ctx) {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable() => {
                on_recoverable(step, &e);
                StepOutcome::goto(step)
            }
            Err(e) => return Err(e),
        };
        ctx = ctx.merge(outcome.patch);
        match outcome.next {
            Some(next) => step = next,
            None => {
                debug!(step = %step, "session finished");
                return Ok(ctx);
            }
        }
    }
}

/// Settings the steps need beyond the context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    pub user_id: String,
    pub poll: PollPolicy,
}

/// Owns the API handle and the prompter for one interactive session.
pub struct Session<'a, A: ?Sized, P: ?Sized> {
    api: &'a A,
    prompter: &'a P,
    settings: SessionSettings,
}

impl<'a, A, P> Session<'a, A, P>
where
    A: AssistantsApi + ?Sized,
    P: Prompter + ?Sized,
{
    pub fn new(api: &'a A, prompter: &'a P, settings: SessionSettings) -> Self {
        Session {
            api,
            prompter,
            settings,
        }
    }

    /// Execute a single step against `ctx`.
    pub fn execute(&self, step: Step, ctx: &Context) -> Result<StepOutcome, CliError> {
        match step {
            Step::Initial => steps::initial(self.api, self.prompter),
            Step::CreateAssistant => steps::create_assistant(self.api, self.prompter, ctx),
            Step::CreateThread => steps::create_thread(self.api),
            Step::RunThread => steps::run_thread(self.api, self.prompter, &self.settings, ctx),
        }
    }

    pub fn run(&self, ctx: Context, start: Step) -> Result<Context, CliError> {
        drive(
            ctx,
            start,
            |step, ctx| self.execute(step, ctx),
            |step, e| {
                warn!(step = %step, error = %e, "step failed, retrying");
                self.prompter.warn(&e.to_string());
            },
        )
    }
}
