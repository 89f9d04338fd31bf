//! Workspace mode switching inside the shell.

use thiserror::Error;

const LOGO_TAPS_FOR_SETTINGS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Preview,
    Edit,
    Shop,
    Profile,
    Settings,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("admin role required")]
pub struct AdminRequired;

/// Data a mode needs fetched on entry. The caller runs the fetch and hands
/// the result back together with the token it was issued with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFetch {
    Packages,
    AdminTransactions,
    AdminStats,
}

/// Ticket tying a fetch to the mode epoch it was started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    epoch: u64,
}

#[derive(Debug)]
pub struct ModeController {
    mode: AppMode,
    logo_taps: u8,
    epoch: u64,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self {
            mode: AppMode::Preview,
            logo_taps: 0,
            epoch: 0,
        }
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    /// The mode to actually render. Re-checks the admin role so a stale
    /// `Admin` selection can never be shown to a demoted account.
    pub fn render_mode(&self, is_admin: bool) -> AppMode {
        if self.mode == AppMode::Admin && !is_admin {
            AppMode::Preview
        } else {
            self.mode
        }
    }

    /// Switches mode and issues the entry fetches for it. Each switch bumps
    /// the epoch, so results from a previous mode are dropped by [`accept`].
    ///
    /// [`accept`]: ModeController::accept
    pub fn select(
        &mut self,
        mode: AppMode,
        is_admin: bool,
    ) -> Result<(Vec<ModeFetch>, FetchToken), AdminRequired> {
        if mode == AppMode::Admin && !is_admin {
            return Err(AdminRequired);
        }
        self.mode = mode;
        self.logo_taps = 0;
        self.epoch += 1;
        let fetches = match mode {
            AppMode::Shop => vec![ModeFetch::Packages],
            AppMode::Admin => vec![ModeFetch::AdminTransactions, ModeFetch::AdminStats],
            _ => Vec::new(),
        };
        Ok((fetches, FetchToken { epoch: self.epoch }))
    }

    /// Hidden settings entry: three taps on the logo. Returns whether this
    /// tap opened settings; the counter resets either way once it fires.
    pub fn tap_logo(&mut self) -> bool {
        self.logo_taps += 1;
        if self.logo_taps >= LOGO_TAPS_FOR_SETTINGS {
            self.logo_taps = 0;
            self.mode = AppMode::Settings;
            self.epoch += 1;
            return true;
        }
        false
    }

    /// Whether a fetch result is still for the current mode.
    pub fn accept(&self, token: FetchToken) -> bool {
        token.epoch == self.epoch
    }
}
