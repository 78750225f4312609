use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Errors that may be returned by the raffle vault program
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum RaffleError {
    #[error("Ticket price must be greater than zero")]
    InvalidTicketPrice,

    #[error("Vault duration must be positive")]
    InvalidDuration,

    /// Entries and exits are refused once the deadline passed or a winner exists
    #[error("Vault has already closed")]
    VaultClosed,

    #[error("Vault is still running")]
    VaultStillRunning,

    #[error("Maximum number of tickets reached")]
    MaxTicketsReached,

    #[error("Duplicate entry detected")]
    DuplicateEntry,

    #[error("Ticket not found for this payer")]
    TicketNotFound,

    #[error("No tickets were sold")]
    NoTicketsSold,

    #[error("Winner already chosen")]
    WinnerAlreadyChosen,

    /// Covers both a vault that was never finalized and a prize already claimed
    #[error("Missing pending winner")]
    MissingPendingWinner,

    #[error("Caller is not the recorded winner")]
    NotRecordedWinner,

    /// Signer or vault address does not match the stored authority
    #[error("A seeds constraint was violated")]
    AuthorityMismatch,

    #[error("Tickets still outstanding")]
    TicketsStillOutstanding,

    #[error("Math overflow")]
    MathOverflow,

    #[error("Vault does not hold enough lamports")]
    InsufficientVaultFunds,

    #[error("Nothing to pay out")]
    NothingToPayout,

    #[error("Vault is not initialized")]
    VaultNotInitialized,
}

impl From<RaffleError> for ProgramError {
    fn from(e: RaffleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for RaffleError {
    fn type_of() -> &'static str {
        "Raffle Vault Error"
    }
}

impl PrintProgramError for RaffleError {
    fn print<E>(&self) {
        msg!(&self.to_string());
    }
}
