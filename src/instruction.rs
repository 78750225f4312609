use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::utils::find_vault_address;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaffleInstruction {
    /// Create the vault for an authority
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The authority, pays for the vault account
    /// 1. `[writable]` The vault account (PDA of `["vault", authority]`)
    /// 2. `[]` The system program
    InitializeRaffle {
        /// Price per ticket in lamports
        ticket_price: u64,
        /// Capacity, clamped to `1..=MAX_TICKETS`
        max_tickets: u32,
        /// Seconds until entries close; `None` never closes
        duration_seconds: Option<i64>,
    },

    /// Buy one ticket
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer, pays the ticket price
    /// 1. `[writable]` The vault account
    /// 2. `[]` The system program
    EnterRaffle,

    /// Refund the caller's ticket
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The buyer receiving the refund
    /// 1. `[writable]` The vault account
    ExitRaffle,

    /// Draw the winner once the deadline has passed
    ///
    /// Accounts expected:
    /// 0. `[signer]` The vault authority
    /// 1. `[writable]` The vault account
    FinalizeRaffle,

    /// Transfer the pending prize to the recorded winner
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The recorded winner
    /// 1. `[writable]` The vault account
    ClaimPrize,

    /// Close an empty vault and return its rent to the authority
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The vault authority
    /// 1. `[writable]` The vault account
    CancelRaffle,
}

impl RaffleInstruction {
    /// Unpacks a byte buffer into a RaffleInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (ticket_price, rest) = Self::unpack_u64(rest)?;
                let (max_tickets, rest) = Self::unpack_u32(rest)?;
                let (duration_seconds, _) = Self::unpack_option_i64(rest)?;
                Self::InitializeRaffle {
                    ticket_price,
                    max_tickets,
                    duration_seconds,
                }
            }
            1 => Self::EnterRaffle,
            2 => Self::ExitRaffle,
            3 => Self::FinalizeRaffle,
            4 => Self::ClaimPrize,
            5 => Self::CancelRaffle,
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a RaffleInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match *self {
            Self::InitializeRaffle {
                ticket_price,
                max_tickets,
                duration_seconds,
            } => {
                buf.push(0);
                buf.extend_from_slice(&ticket_price.to_le_bytes());
                buf.extend_from_slice(&max_tickets.to_le_bytes());
                match duration_seconds {
                    Some(duration) => {
                        buf.push(1);
                        buf.extend_from_slice(&duration.to_le_bytes());
                    }
                    None => buf.push(0),
                }
            }
            Self::EnterRaffle => buf.push(1),
            Self::ExitRaffle => buf.push(2),
            Self::FinalizeRaffle => buf.push(3),
            Self::ClaimPrize => buf.push(4),
            Self::CancelRaffle => buf.push(5),
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::split(input, 8)?;
        let value = bytes
            .try_into()
            .map(u64::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::split(input, 4)?;
        let value = bytes
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((value, rest))
    }

    fn unpack_option_i64(input: &[u8]) -> Result<(Option<i64>, &[u8]), ProgramError> {
        let (flag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;
        match flag {
            0 => Ok((None, rest)),
            1 => {
                let (bytes, rest) = Self::split(rest, 8)?;
                let value = bytes
                    .try_into()
                    .map(i64::from_le_bytes)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Ok((Some(value), rest))
            }
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    fn split(input: &[u8], len: usize) -> Result<(&[u8], &[u8]), ProgramError> {
        if input.len() < len {
            return Err(ProgramError::InvalidInstructionData);
        }
        Ok(input.split_at(len))
    }
}

/// Create initialize_raffle instruction
pub fn initialize_raffle(
    program_id: &Pubkey,
    authority: &Pubkey,
    ticket_price: u64,
    max_tickets: u32,
    duration_seconds: Option<i64>,
) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);
    let data = RaffleInstruction::InitializeRaffle {
        ticket_price,
        max_tickets,
        duration_seconds,
    }
    .pack();

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*authority, true),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data,
    }
}

/// Create enter_raffle instruction
pub fn enter_raffle(program_id: &Pubkey, payer: &Pubkey, authority: &Pubkey) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(vault, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: RaffleInstruction::EnterRaffle.pack(),
    }
}

/// Create exit_raffle instruction
pub fn exit_raffle(program_id: &Pubkey, payer: &Pubkey, authority: &Pubkey) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*payer, true), AccountMeta::new(vault, false)],
        data: RaffleInstruction::ExitRaffle.pack(),
    }
}

/// Create finalize_raffle instruction
pub fn finalize_raffle(program_id: &Pubkey, authority: &Pubkey) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*authority, true),
            AccountMeta::new(vault, false),
        ],
        data: RaffleInstruction::FinalizeRaffle.pack(),
    }
}

/// Create claim_prize instruction
pub fn claim_prize(program_id: &Pubkey, winner: &Pubkey, authority: &Pubkey) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*winner, true), AccountMeta::new(vault, false)],
        data: RaffleInstruction::ClaimPrize.pack(),
    }
}

/// Create cancel_raffle instruction
pub fn cancel_raffle(program_id: &Pubkey, authority: &Pubkey) -> Instruction {
    let (vault, _) = find_vault_address(program_id, authority);

    Instruction {
        program_id: *program_id,
        accounts: vec![AccountMeta::new(*authority, true), AccountMeta::new(vault, false)],
        data: RaffleInstruction::CancelRaffle.pack(),
    }
}
