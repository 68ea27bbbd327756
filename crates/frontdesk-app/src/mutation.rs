// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{Employee, EmployeeActivation, EmployeeId, PageRequest, PageState};

/// A requested change to an employee's active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveToggle {
    pub emp_id: EmployeeId,
    pub requested: bool,
}

impl ActiveToggle {
    /// Flips the flag currently shown for `employee`.
    pub fn flip(employee: &Employee) -> Self {
        Self {
            emp_id: employee.emp_id,
            requested: !employee.emp_details.is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleResult {
    Patched,
    /// Confirmed, but the row is no longer on the displayed page.
    NotDisplayed,
}

/// Accepts a toggle echo only when it reports the requested state, then
/// patches the displayed row in place. A mismatched echo leaves the page
/// untouched.
pub fn apply_active_toggle(
    page: &mut PageState<Employee>,
    toggle: ActiveToggle,
    echoed: &EmployeeActivation,
) -> Result<ToggleResult> {
    if echoed.emp_id != toggle.emp_id {
        bail!(
            "backend confirmed employee {} but employee {} was toggled -- refresh and retry",
            echoed.emp_id,
            toggle.emp_id
        );
    }
    if echoed.is_active != toggle.requested {
        bail!(
            "backend reports employee {} is {} after requesting {} -- row left unchanged",
            toggle.emp_id,
            active_label(echoed.is_active),
            active_label(toggle.requested)
        );
    }

    let patched = page.patch(&toggle.emp_id, |employee| {
        employee.emp_details.is_active = toggle.requested;
    });
    Ok(if patched {
        ToggleResult::Patched
    } else {
        ToggleResult::NotDisplayed
    })
}

/// After a successful create the list restarts at the first page.
pub fn resync_after_create<T>(page: &mut PageState<T>) -> PageRequest {
    page.reset()
}

pub const fn active_label(active: bool) -> &'static str {
    if active { "active" } else { "inactive" }
}
