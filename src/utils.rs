// Raffle Vault Program - Address derivation and fund movement
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction, system_program,
    sysvar::{rent::Rent, Sysvar},
};

use crate::error::RaffleError;

pub const VAULT_SEED: &[u8] = b"vault";

/// Find the program derived address of the vault owned by `authority`
pub fn find_vault_address(program_id: &Pubkey, authority: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, authority.as_ref()], program_id)
}

/// Re-derive the vault address from its stored bump and compare it with the account passed in
pub fn assert_vault_address(
    program_id: &Pubkey,
    vault_key: &Pubkey,
    authority: &Pubkey,
    bump: u8,
) -> ProgramResult {
    let expected =
        Pubkey::create_program_address(&[VAULT_SEED, authority.as_ref(), &[bump]], program_id)
            .map_err(|_| RaffleError::AuthorityMismatch)?;
    if expected != *vault_key {
        msg!("Vault address does not match authority {}", authority);
        return Err(RaffleError::AuthorityMismatch.into());
    }
    Ok(())
}

/// Allocate the vault PDA and hand it to the program.
///
/// Anyone can send lamports to the derived address before it is created, which
/// makes `create_account` fail. A funded address is topped up to the rent-exempt
/// minimum, then allocated and assigned instead.
pub fn create_vault_account<'a>(
    payer: &AccountInfo<'a>,
    vault: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    program_id: &Pubkey,
    space: usize,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    if *system_program_info.key != system_program::id() {
        msg!("Expected the system program");
        return Err(ProgramError::IncorrectProgramId);
    }

    let rent_lamports = Rent::get()?.minimum_balance(space);
    let current_lamports = vault.lamports();

    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                vault.key,
                rent_lamports,
                space as u64,
                program_id,
            ),
            &[payer.clone(), vault.clone(), system_program_info.clone()],
            &[signer_seeds],
        );
    }

    msg!(
        "Vault address already holds {} lamports, allocating in place",
        current_lamports
    );

    let top_up = rent_lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, vault.key, top_up),
            &[payer.clone(), vault.clone(), system_program_info.clone()],
        )?;
    }

    invoke_signed(
        &system_instruction::allocate(vault.key, space as u64),
        &[vault.clone(), system_program_info.clone()],
        &[signer_seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(vault.key, program_id),
        &[vault.clone(), system_program_info.clone()],
        &[signer_seeds],
    )
}

/// Move lamports from a signer into vault custody through the system program
pub fn transfer_into_vault<'a>(
    payer: &AccountInfo<'a>,
    vault: &AccountInfo<'a>,
    system_program_info: &AccountInfo<'a>,
    lamports: u64,
) -> ProgramResult {
    if *system_program_info.key != system_program::id() {
        msg!("Expected the system program");
        return Err(ProgramError::IncorrectProgramId);
    }

    invoke(
        &system_instruction::transfer(payer.key, vault.key, lamports),
        &[payer.clone(), vault.clone(), system_program_info.clone()],
    )
}

/// Pay lamports out of vault custody without touching its rent-exempt reserve
pub fn transfer_from_vault(
    vault: &AccountInfo,
    recipient: &AccountInfo,
    lamports: u64,
) -> ProgramResult {
    let reserve = Rent::get()?.minimum_balance(vault.data_len());
    let available = vault.lamports().saturating_sub(reserve);
    if available < lamports {
        msg!(
            "Vault holds {} lamports above its reserve, {} requested",
            available,
            lamports
        );
        return Err(RaffleError::InsufficientVaultFunds.into());
    }

    let vault_balance = vault
        .lamports()
        .checked_sub(lamports)
        .ok_or(RaffleError::MathOverflow)?;
    let recipient_balance = recipient
        .lamports()
        .checked_add(lamports)
        .ok_or(RaffleError::MathOverflow)?;

    **vault.try_borrow_mut_lamports()? = vault_balance;
    **recipient.try_borrow_mut_lamports()? = recipient_balance;
    Ok(())
}

/// Close the vault: every lamport goes to `destination` and the account is handed back to the system program
pub fn close_vault(vault: &AccountInfo, destination: &AccountInfo) -> ProgramResult {
    let destination_balance = destination
        .lamports()
        .checked_add(vault.lamports())
        .ok_or(RaffleError::MathOverflow)?;

    **destination.try_borrow_mut_lamports()? = destination_balance;
    **vault.try_borrow_mut_lamports()? = 0;

    vault.realloc(0, false)?;
    vault.assign(&system_program::id());
    Ok(())
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
