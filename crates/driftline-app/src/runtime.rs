//! Generic runtime for application orchestration.
//!
//! The Runtime drives the event loop, coordinating between:
//! - [`App`]: chat state machine
//! - [`Driver`]: platform-specific rendering and transport

use driftline_core::Environment;

use crate::{App, AppAction, AppEvent, Driver};

/// Generic runtime that orchestrates App and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    app: App<E>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(driver: D, env: E, own_user_id: u64, own_display_name: impl Into<String>) -> Self {
        Self { driver, app: App::new(env, own_user_id, own_display_name) }
    }

    /// Run the main event loop.
    ///
    /// Each cycle polls the driver for one event, feeds it to the app,
    /// executes the resulting actions, then runs the periodic sweep. Actions
    /// whose execution produces a new event (a failed dispatch, a scroll
    /// height measurement) re-enter the app before the cycle ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters an I/O error.
    pub async fn run(mut self) -> Result<(), D::Error> {
        loop {
            if let Some(event) = self.driver.poll_event().await? {
                let actions = self.app.handle(event);
                if self.process_actions(actions).await? {
                    break;
                }
            }

            let actions = self.app.handle(AppEvent::Tick);
            if self.process_actions(actions).await? {
                break;
            }
        }

        self.driver.stop();
        Ok(())
    }

    /// Execute actions, feeding completion events back into the app.
    ///
    /// Returns `true` if the application should quit.
    async fn process_actions(&mut self, initial: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending = initial;

        while !pending.is_empty() {
            let actions = std::mem::take(&mut pending);

            for action in actions {
                match action {
                    AppAction::Quit => return Ok(true),
                    AppAction::FetchHistory { token, request } => {
                        self.driver.start_history_fetch(token, request);
                    },
                    AppAction::DispatchSend(message) => {
                        let correlation = message.correlation;
                        if let Err(error) = self.driver.send_live(message).await {
                            tracing::warn!(%error, correlation, "live dispatch failed");
                            pending.extend(self.app.handle(AppEvent::SendFailed { correlation }));
                        }
                    },
                    AppAction::JoinConversation(conversation) => {
                        if let Err(error) = self.driver.join_conversation(conversation).await {
                            tracing::warn!(%error, %conversation, "conversation join failed");
                            self.driver.render(&AppAction::Notify {
                                text: "Failed to join conversation".to_string(),
                                is_error: true,
                            })?;
                        }
                    },
                    AppAction::MeasureScrollHeight => {
                        let new_scroll_height = self.driver.measure_scroll_height();
                        pending.extend(
                            self.app.handle(AppEvent::PrependRendered { new_scroll_height }),
                        );
                    },
                    other => self.driver.render(&other)?,
                }
            }
        }

        Ok(false)
    }

    /// Get a reference to the App.
    pub fn app(&self) -> &App<E> {
        &self.app
    }

    /// Get a mutable reference to the App.
    pub fn app_mut(&mut self) -> &mut App<E> {
        &mut self.app
    }
}
