//! Registration form state machine.
//!
//! The workflow is mounted with the grant produced by email verification,
//! looks a student up by roll number, then sets the password. Each call holds
//! `&mut self`, so one instance never has two requests in flight.

use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{debug, instrument, warn};

use super::{
    api::PortalApi,
    errors::PortalError,
    gate::{check_gate, GateRejection, Route, VerificationGrant, ACCESS_DENIED_NOTICE},
    strength::Strength,
};
use crate::portal::types::{SetPasswordRequest, StudentProfile};

pub const STUDENT_NOT_FOUND_MESSAGE: &str = "Student not found. Please check the roll number.";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Passwords do not match.";
pub const PASSWORD_UPDATED_MESSAGE: &str = "Password updated successfully!";
pub const PASSWORD_UPDATE_FAILED_MESSAGE: &str = "Failed to update password. Please try again.";
pub const ROLL_NUMBER_REQUIRED_MESSAGE: &str = "Please enter a roll number.";
pub const PASSWORD_REQUIRED_MESSAGE: &str = "Please fill in both password fields.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Only the roll number input and "Find Student" are shown.
    Lookup,
    /// Profile fields and the password inputs are shown.
    Found,
}

/// Server call currently in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Searching,
    Updating,
}

impl Activity {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Searching,
            2 => Self::Updating,
            _ => Self::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Searching => 1,
            Self::Updating => 2,
        }
    }
}

/// Shared handle on the workflow's in-flight call. Clone it before awaiting
/// `find_student` or `submit_password` to render progress from elsewhere.
#[derive(Clone, Debug, Default)]
pub struct ActivityMonitor(Arc<AtomicU8>);

impl ActivityMonitor {
    #[must_use]
    pub fn current(&self) -> Activity {
        Activity::from_u8(self.0.load(Ordering::SeqCst))
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current() != Activity::Idle
    }

    fn begin(&self, activity: Activity) -> ActivityGuard {
        self.0.store(activity.as_u8(), Ordering::SeqCst);
        ActivityGuard(self.clone())
    }
}

/// Resets the monitor to idle when the call finishes or its future is dropped.
struct ActivityGuard(ActivityMonitor);

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        (self.0).0.store(Activity::Idle.as_u8(), Ordering::SeqCst);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Error(String),
    Success(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldView {
    pub value: String,
    pub visible: bool,
    pub editable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub visible: bool,
    pub enabled: bool,
}

/// Snapshot of what the form renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormView {
    pub stage: Stage,
    pub roll_number: FieldView,
    pub name: FieldView,
    pub semester: FieldView,
    pub branch: FieldView,
    pub email: FieldView,
    pub password: FieldView,
    pub confirm_password: FieldView,
    pub strength: Option<Strength>,
    pub find_button: ButtonView,
    pub update_button: ButtonView,
    pub notice: Option<Notice>,
}

pub struct RegistrationWorkflow<A> {
    api: A,
    grant: VerificationGrant,
    stage: Stage,
    roll_number: String,
    found_roll_number: String,
    name: String,
    semester: String,
    branch: String,
    email: String,
    password: String,
    confirm_password: String,
    strength: Strength,
    activity: ActivityMonitor,
    notice: Option<Notice>,
    last_failure: Option<PortalError>,
}

impl<A: PortalApi> RegistrationWorkflow<A> {
    /// Mount the form if the grant is present and still valid.
    ///
    /// # Errors
    /// Returns a [`GateRejection`] redirecting to `/otpverify` otherwise.
    pub fn mount(api: A, grant: Option<VerificationGrant>) -> Result<Self, GateRejection> {
        Self::mount_at(api, grant, Instant::now())
    }

    /// # Errors
    /// Same as [`RegistrationWorkflow::mount`], evaluated at `now`.
    pub fn mount_at(
        api: A,
        grant: Option<VerificationGrant>,
        now: Instant,
    ) -> Result<Self, GateRejection> {
        check_gate(grant.as_ref(), now)?;
        let Some(grant) = grant else {
            return Err(GateRejection {
                notice: ACCESS_DENIED_NOTICE,
                redirect: Route::OtpVerify,
            });
        };

        let email = grant.email().to_string();
        Ok(Self {
            api,
            grant,
            stage: Stage::Lookup,
            roll_number: String::new(),
            found_roll_number: String::new(),
            name: String::new(),
            semester: String::new(),
            branch: String::new(),
            email,
            password: String::new(),
            confirm_password: String::new(),
            strength: Strength::from_score(0),
            activity: ActivityMonitor::default(),
            notice: None,
            last_failure: None,
        })
    }

    pub fn set_roll_number(&mut self, roll_number: &str) {
        self.roll_number = roll_number.to_string();
    }

    /// Updates the strength meter as a side effect.
    pub fn set_password(&mut self, password: &str) {
        self.password = password.to_string();
        self.strength = Strength::of(password);
    }

    pub fn set_confirm_password(&mut self, password: &str) {
        self.confirm_password = password.to_string();
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        self.stage == Stage::Found
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.activity.is_busy()
    }

    #[must_use]
    pub fn activity_monitor(&self) -> ActivityMonitor {
        self.activity.clone()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Cause of the most recent failed call.
    #[must_use]
    pub fn last_failure(&self) -> Option<&PortalError> {
        self.last_failure.as_ref()
    }

    #[must_use]
    pub fn strength(&self) -> Strength {
        self.strength
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Look the student up and pre-fill the profile fields.
    ///
    /// # Errors
    /// Returns the cause; the form shows a fixed not-found message.
    #[instrument(skip(self), fields(roll_number = %self.roll_number.trim()))]
    pub async fn find_student(&mut self) -> Result<(), PortalError> {
        let roll_number = self.roll_number.trim().to_string();
        if roll_number.is_empty() {
            return Err(self.fail(
                ROLL_NUMBER_REQUIRED_MESSAGE,
                PortalError::Validation("Roll number is required".to_string()),
            ));
        }

        let guard = self.activity.begin(Activity::Searching);
        let result = self.api.lookup_student(&roll_number).await;
        drop(guard);

        match result {
            Ok(profile) => {
                debug!("student found");
                self.apply_profile(&roll_number, profile);
                Ok(())
            }
            Err(err) => {
                warn!("student lookup failed: {err}");
                self.stage = Stage::Lookup;
                self.found_roll_number.clear();
                Err(self.fail(STUDENT_NOT_FOUND_MESSAGE, err))
            }
        }
    }

    /// Submit the new password. Yields the login route on success.
    ///
    /// # Errors
    /// Local validation failures never reach the server.
    #[instrument(skip(self))]
    pub async fn submit_password(&mut self) -> Result<Route, PortalError> {
        if self.stage != Stage::Found {
            return Err(self.fail(
                STUDENT_NOT_FOUND_MESSAGE,
                PortalError::Validation("No student selected".to_string()),
            ));
        }

        if self.password.is_empty() || self.confirm_password.is_empty() {
            return Err(self.fail(
                PASSWORD_REQUIRED_MESSAGE,
                PortalError::Validation("Password is required".to_string()),
            ));
        }

        if self.password != self.confirm_password {
            return Err(self.fail(
                PASSWORD_MISMATCH_MESSAGE,
                PortalError::Validation(PASSWORD_MISMATCH_MESSAGE.to_string()),
            ));
        }

        let request = SetPasswordRequest {
            roll_number: self.found_roll_number.clone(),
            password: self.password.clone(),
        };

        let guard = self.activity.begin(Activity::Updating);
        let result = self.api.set_password(&request, self.grant.token()).await;
        drop(guard);

        match result {
            Ok(()) => {
                debug!("password updated");
                self.notice = Some(Notice::Success(PASSWORD_UPDATED_MESSAGE.to_string()));
                self.last_failure = None;
                self.password.clear();
                self.confirm_password.clear();
                self.strength = Strength::from_score(0);
                Ok(Route::Login)
            }
            Err(err) => {
                warn!("password update failed: {err}");
                Err(self.fail(PASSWORD_UPDATE_FAILED_MESSAGE, err))
            }
        }
    }

    #[must_use]
    pub fn view(&self) -> FormView {
        let found = self.stage == Stage::Found;
        let activity = self.activity.current();
        let busy = activity != Activity::Idle;
        let read_only = |value: &str| FieldView {
            value: value.to_string(),
            visible: found,
            editable: false,
        };
        let secret = |value: &str| FieldView {
            value: value.to_string(),
            visible: found,
            editable: !busy,
        };

        FormView {
            stage: self.stage,
            roll_number: FieldView {
                value: self.roll_number.clone(),
                visible: true,
                editable: !busy,
            },
            name: read_only(&self.name),
            semester: read_only(&self.semester),
            branch: read_only(&self.branch),
            email: read_only(&self.email),
            password: secret(&self.password),
            confirm_password: secret(&self.confirm_password),
            strength: (found && !self.password.is_empty()).then_some(self.strength),
            find_button: ButtonView {
                label: if activity == Activity::Searching {
                    "Searching..."
                } else {
                    "Find Student"
                },
                visible: true,
                enabled: !busy && !self.roll_number.trim().is_empty(),
            },
            update_button: ButtonView {
                label: if activity == Activity::Updating {
                    "Updating..."
                } else {
                    "Update Password"
                },
                visible: found,
                enabled: !busy
                    && !self.password.is_empty()
                    && !self.confirm_password.is_empty(),
            },
            notice: self.notice.clone(),
        }
    }

    fn apply_profile(&mut self, roll_number: &str, profile: StudentProfile) {
        self.found_roll_number = if profile.roll_number.is_empty() {
            roll_number.to_string()
        } else {
            profile.roll_number
        };
        self.name = profile.name;
        self.semester = profile.semester;
        self.branch = profile.branch;
        self.email = profile.email;
        self.password.clear();
        self.confirm_password.clear();
        self.strength = Strength::from_score(0);
        self.stage = Stage::Found;
        self.notice = None;
        self.last_failure = None;
    }

    fn fail(&mut self, message: &str, err: PortalError) -> PortalError {
        self.notice = Some(Notice::Error(message.to_string()));
        self.last_failure = Some(err.clone());
        err
    }
}
