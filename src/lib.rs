#![allow(unexpected_cfgs)]

// Raffle Vault
// Single-winner raffle escrow: ticket sales, refunds, deadline-gated draw,
// two-phase payout and cancellation of an empty vault.

pub mod draw;
pub mod error;
pub mod instruction;
pub mod processor;
pub mod state;
pub mod utils;

#[cfg(not(feature = "no-entrypoint"))]
pub mod entrypoint;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

solana_program::declare_id!("BRWhr8mqPoi9gsKrie32hWdLU2jWKBh3PixLXg4sAytA");

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
