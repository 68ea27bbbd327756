// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, RoomStateFilter, ScreenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_screen: ScreenKind,
    pub room_filter: RoomStateFilter,
    pub username: Option<String>,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Login,
            active_screen: ScreenKind::Dashboard,
            room_filter: RoomStateFilter::All,
            username: None,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    GoTo(ScreenKind),
    OpenForm(FormKind),
    CloseForm,
    SignedIn(String),
    SignedOut,
    /// The backend refused the stored token.
    SessionRejected,
    CycleRoomFilter,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    RoomFilterChanged(RoomStateFilter),
    SessionStarted(String),
    SessionEnded,
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn is_signed_in(&self) -> bool {
        self.username.is_some()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::GoTo(screen) => {
                if !self.is_signed_in() || self.active_screen == screen {
                    return Vec::new();
                }
                self.active_screen = screen;
                vec![AppEvent::ScreenChanged(screen)]
            }
            AppCommand::OpenForm(kind) => {
                if kind != FormKind::Login && !self.is_signed_in() {
                    return vec![self.set_status("sign in first")];
                }
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::CloseForm => {
                self.mode = self.resting_mode();
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SignedIn(username) => {
                self.username = Some(username.clone());
                self.mode = AppMode::Nav;
                let status = format!("signed in as {username}");
                vec![
                    AppEvent::SessionStarted(username),
                    AppEvent::ModeChanged(self.mode),
                    self.set_status(&status),
                ]
            }
            AppCommand::SignedOut => self.end_session("signed out"),
            AppCommand::SessionRejected => {
                self.end_session("session expired -- sign in again")
            }
            AppCommand::CycleRoomFilter => {
                self.room_filter = self.room_filter.cycle();
                let status = format!("rooms: {}", self.room_filter.as_str());
                vec![
                    AppEvent::RoomFilterChanged(self.room_filter),
                    self.set_status(&status),
                ]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn resting_mode(&self) -> AppMode {
        if self.is_signed_in() {
            AppMode::Nav
        } else {
            AppMode::Login
        }
    }

    fn end_session(&mut self, message: &str) -> Vec<AppEvent> {
        self.username = None;
        self.mode = AppMode::Login;
        vec![
            AppEvent::SessionEnded,
            AppEvent::ModeChanged(self.mode),
            self.set_status(message),
        ]
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.mode != AppMode::Nav {
            return Vec::new();
        }
        let screens = ScreenKind::ALL;
        let current = screens
            .iter()
            .position(|screen| *screen == self.active_screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_screen = screens[next];
        vec![AppEvent::ScreenChanged(self.active_screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
