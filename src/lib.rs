// Library root
// -----------
// The binary (`main.rs`) wires these modules into the interactive client.
//
// Module responsibilities:
// - `config`: layered `.env.default` / `.env` loading into a typed `Config`.
// - `api`: blocking HTTP client for the assistants API and models catalog.
// - `run`: create-and-poll for assistant runs with timeout and cancellation.
// - `session`: the step loop controller and the session context.
// - `steps`: the four interactive steps (initial, createAssistant,
//   createThread, runThread).
// - `ui`: terminal prompts behind the `Prompter` trait.
// - `error`: error kinds and which of them the loop can recover from.
pub mod api;
pub mod config;
pub mod error;
pub mod run;
pub mod session;
pub mod steps;
pub mod ui;
