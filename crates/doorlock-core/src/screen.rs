//! What the 16x2 character LCD shows.
//!
//! The HMI emits a [`Screen`] and the driver decides how to paint it; the text
//! itself lives here so every driver shows the same thing.

/// Width of one LCD row.
pub const COLUMNS: usize = 16;

/// A full-screen view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Power-on banner while waiting for the Control node
    Welcome,
    /// Stored credential found at boot
    PreviousPassword,
    /// First entry of a new password
    NewPassword {
        /// Digits typed
        typed: usize,
    },
    /// Confirmation entry of a new password
    ConfirmPassword {
        /// Digits typed
        typed: usize,
    },
    /// Confirmation did not match
    PasswordsDiffer,
    /// Password accepted
    Correct,
    /// Control persisted the new password
    PasswordSaved,
    /// Control failed to persist the new password
    PasswordNotSaved,
    /// Main menu
    Menu,
    /// Change-password flow selected
    ChangePassword,
    /// Door flow selected
    OpenDoor,
    /// Password prompt
    EnterPassword {
        /// Digits typed
        typed: usize,
        /// Recovering from a lockout
        locked: bool,
    },
    /// Password rejected
    WrongPassword {
        /// Attempts left before lockout
        remaining: u8,
    },
    /// Lockout alarm running
    Alarm {
        /// Seconds left
        remaining: u32,
    },
    /// Door opening
    DoorOpening {
        /// Seconds left
        remaining: u32,
    },
    /// Door closing
    DoorClosing {
        /// Seconds left
        remaining: u32,
    },
    /// Peer did not answer or rejected the exchange
    LinkError,
}

impl Screen {
    /// Both rows, each at most [`COLUMNS`] characters.
    pub fn lines(&self) -> [String; 2] {
        let (top, bottom) = match *self {
            Self::Welcome => ("Door Lock System".to_owned(), "Connecting...".to_owned()),
            Self::PreviousPassword => ("Password found".to_owned(), String::new()),
            Self::NewPassword { typed } => ("Enter New Pass:".to_owned(), stars(typed)),
            Self::ConfirmPassword { typed } => ("Re-enter Pass:".to_owned(), stars(typed)),
            Self::PasswordsDiffer => ("Passwords differ".to_owned(), "Try again".to_owned()),
            Self::Correct => ("Correct Pass".to_owned(), String::new()),
            Self::PasswordSaved => ("Password Saved!".to_owned(), String::new()),
            Self::PasswordNotSaved => ("Pass Not Saved".to_owned(), "Try again".to_owned()),
            Self::Menu => ("+: Change Pass".to_owned(), "-: Open Door".to_owned()),
            Self::ChangePassword => ("Change Password".to_owned(), String::new()),
            Self::OpenDoor => ("Open Door".to_owned(), String::new()),
            Self::EnterPassword { typed, locked: false } => ("Enter Password:".to_owned(), stars(typed)),
            Self::EnterPassword { typed, locked: true } => ("Locked: Enter".to_owned(), stars(typed)),
            Self::WrongPassword { remaining } => {
                ("Wrong Password".to_owned(), format!("{remaining} tries left"))
            },
            Self::Alarm { remaining } => ("!! INTRUDER !!".to_owned(), format!("Wait {remaining}s")),
            Self::DoorOpening { remaining } => ("Door Unlocking".to_owned(), format!("{remaining}s")),
            Self::DoorClosing { remaining } => ("Door Locking".to_owned(), format!("{remaining}s")),
            Self::LinkError => ("Link Error".to_owned(), "Try again".to_owned()),
        };
        [top, bottom]
    }
}

fn stars(typed: usize) -> String {
    "*".repeat(typed.min(COLUMNS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_text() {
        insta::assert_debug_snapshot!(Screen::Menu.lines(), @r#"
        [
            "+: Change Pass",
            "-: Open Door",
        ]
        "#);
    }

    #[test]
    fn typed_digits_are_masked() {
        let [top, bottom] = Screen::EnterPassword { typed: 3, locked: false }.lines();
        assert_eq!(top, "Enter Password:");
        assert_eq!(bottom, "***");
    }

    #[test]
    fn every_row_fits() {
        let screens = [
            Screen::Welcome,
            Screen::PreviousPassword,
            Screen::NewPassword { typed: 5 },
            Screen::ConfirmPassword { typed: 5 },
            Screen::PasswordsDiffer,
            Screen::Correct,
            Screen::PasswordSaved,
            Screen::PasswordNotSaved,
            Screen::Menu,
            Screen::ChangePassword,
            Screen::OpenDoor,
            Screen::EnterPassword { typed: 5, locked: true },
            Screen::WrongPassword { remaining: 2 },
            Screen::Alarm { remaining: 60 },
            Screen::DoorOpening { remaining: 10 },
            Screen::DoorClosing { remaining: 10 },
            Screen::LinkError,
        ];
        for screen in screens {
            for line in screen.lines() {
                assert!(line.chars().count() <= COLUMNS, "{screen:?}: {line:?}");
            }
        }
    }
}
