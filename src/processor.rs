use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
    sysvar::{clock::Clock, Sysvar},
};

use crate::{
    error::RaffleError,
    instruction::RaffleInstruction,
    state::Vault,
    utils::{self, VAULT_SEED},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = RaffleInstruction::unpack(instruction_data)?;

        match instruction {
            RaffleInstruction::InitializeRaffle {
                ticket_price,
                max_tickets,
                duration_seconds,
            } => {
                msg!("Instruction: Initialize Raffle");
                Self::process_initialize_raffle(
                    program_id,
                    accounts,
                    ticket_price,
                    max_tickets,
                    duration_seconds,
                )
            }
            RaffleInstruction::EnterRaffle => {
                msg!("Instruction: Enter Raffle");
                Self::process_enter_raffle(program_id, accounts)
            }
            RaffleInstruction::ExitRaffle => {
                msg!("Instruction: Exit Raffle");
                Self::process_exit_raffle(program_id, accounts)
            }
            RaffleInstruction::FinalizeRaffle => {
                msg!("Instruction: Finalize Raffle");
                Self::process_finalize_raffle(program_id, accounts)
            }
            RaffleInstruction::ClaimPrize => {
                msg!("Instruction: Claim Prize");
                Self::process_claim_prize(program_id, accounts)
            }
            RaffleInstruction::CancelRaffle => {
                msg!("Instruction: Cancel Raffle");
                Self::process_cancel_raffle(program_id, accounts)
            }
        }
    }

    fn process_initialize_raffle(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        ticket_price: u64,
        max_tickets: u32,
        duration_seconds: Option<i64>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let (expected_vault, bump_seed) = utils::find_vault_address(program_id, authority_info.key);
        if *vault_info.key != expected_vault {
            msg!("Invalid vault account address");
            return Err(RaffleError::AuthorityMismatch.into());
        }

        let clock = Clock::get()?;
        let vault = Vault::new(
            *authority_info.key,
            bump_seed,
            ticket_price,
            max_tickets,
            duration_seconds,
            clock.unix_timestamp,
        )
        .map_err(|e| {
            msg!("Initialize rejected: {}", e);
            e
        })?;

        if vault_info.owner == program_id {
            msg!("Vault account is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        utils::create_vault_account(
            authority_info,
            vault_info,
            system_program_info,
            program_id,
            Vault::LEN,
            &[VAULT_SEED, authority_info.key.as_ref(), &[bump_seed]],
        )?;

        vault.save(vault_info)?;

        match vault.end_time {
            Some(end_time) => msg!(
                "Vault initialized: Authority={}, Price={} lamports, MaxTickets={}, EndTime={}",
                authority_info.key,
                vault.ticket_price,
                vault.max_tickets,
                end_time
            ),
            None => msg!(
                "Vault initialized: Authority={}, Price={} lamports, MaxTickets={}, no deadline",
                authority_info.key,
                vault.ticket_price,
                vault.max_tickets
            ),
        }
        Ok(())
    }

    fn process_enter_raffle(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        let clock = Clock::get()?;

        let price = vault
            .enter(*payer_info.key, clock.unix_timestamp)
            .map_err(|e| {
                msg!("Entry rejected: {}", e);
                e
            })?;

        utils::transfer_into_vault(payer_info, vault_info, system_program_info, price)?;
        vault.save(vault_info)?;

        msg!(
            "Ticket {}/{} bought by {} for {} lamports. Pot: {} SOL",
            vault.ticket_count,
            vault.max_tickets,
            payer_info.key,
            price,
            utils::lamports_to_sol(vault.pot)
        );
        Ok(())
    }

    fn process_exit_raffle(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        let clock = Clock::get()?;

        let refund = vault
            .exit(payer_info.key, clock.unix_timestamp)
            .map_err(|e| {
                msg!("Exit rejected: {}", e);
                e
            })?;

        utils::transfer_from_vault(vault_info, payer_info, refund)?;
        vault.save(vault_info)?;

        msg!(
            "Refunded {} lamports to {}. Pot: {} SOL",
            refund,
            payer_info.key,
            utils::lamports_to_sol(vault.pot)
        );
        Ok(())
    }

    /// Records the winner and the owed prize; lamports stay in the vault until claimed
    fn process_finalize_raffle(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        let clock = Clock::get()?;

        let (winner, prize) = vault
            .finalize(authority_info.key, clock.unix_timestamp)
            .map_err(|e| {
                msg!("Finalize rejected: {}", e);
                e
            })?;

        vault.save(vault_info)?;

        msg!(
            "Raffle finalized. Winner: {}, pending prize: {} lamports ({} tickets)",
            winner,
            prize,
            vault.ticket_count
        );
        Ok(())
    }

    fn process_claim_prize(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let winner_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        if !winner_info.is_signer {
            msg!("Winner must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;

        let prize = vault.claim(winner_info.key).map_err(|e| {
            msg!("Claim rejected: {}", e);
            e
        })?;

        utils::transfer_from_vault(vault_info, winner_info, prize)?;
        vault.save(vault_info)?;

        msg!(
            "Prize of {} SOL paid to {}",
            utils::lamports_to_sol(prize),
            winner_info.key
        );
        Ok(())
    }

    fn process_cancel_raffle(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        if !authority_info.is_signer {
            msg!("Authority must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let vault = Self::load_vault(program_id, vault_info)?;

        vault.ensure_cancellable(authority_info.key).map_err(|e| {
            msg!("Cancel rejected: {}", e);
            e
        })?;

        let reclaimed = vault_info.lamports();
        utils::close_vault(vault_info, authority_info)?;

        msg!(
            "Vault closed, {} lamports returned to {}",
            reclaimed,
            authority_info.key
        );
        Ok(())
    }

    /// Load a vault and confirm the account sits at the address derived from its authority
    fn load_vault(program_id: &Pubkey, vault_info: &AccountInfo) -> Result<Vault, ProgramError> {
        if !vault_info.is_writable {
            msg!("Vault account must be writable");
            return Err(ProgramError::InvalidArgument);
        }

        let vault = Vault::load(vault_info, program_id)?;
        utils::assert_vault_address(program_id, vault_info.key, &vault.authority, vault.bump)?;
        Ok(vault)
    }
}
