// Raffle Vault Program - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    clock::UnixTimestamp,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    program_pack::{IsInitialized, Sealed},
    pubkey::Pubkey,
};

use crate::{draw, error::RaffleError};

/// Hard capacity of a vault account; `max_tickets` is clamped to this
pub const MAX_TICKETS: usize = 128;

const PUBKEY: usize = 32;
const U64: usize = 8;
const U32: usize = 4;
const I64: usize = 8;
const BOOL: usize = 1;
const TAG: usize = 1;

pub const TICKET_ENTRY_LEN: usize = PUBKEY + I64;

/// Lifecycle of a vault. Only ever moves `Open -> Finished`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VaultStatus {
    /// Accepting entries and exits until the deadline
    Open,
    /// Winner recorded, no further entries or exits
    Finished,
}

/// One purchased ticket
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct TicketEntry {
    pub buyer: Pubkey,
    pub purchased_at: UnixTimestamp,
}

/// Raffle vault account data, stored at the PDA derived from `authority`
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Vault {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Bump of the vault PDA
    pub bump: u8,
    /// Creator; the only key allowed to finalize or cancel
    pub authority: Pubkey,
    /// Price per ticket in lamports
    pub ticket_price: u64,
    /// Capacity chosen at creation, at most `MAX_TICKETS`
    pub max_tickets: u32,
    pub created_at: UnixTimestamp,
    /// Deadline, or `None` for a vault that never expires
    pub end_time: Option<UnixTimestamp>,
    pub status: VaultStatus,
    pub ticket_count: u32,
    /// Entries in purchase order, searched linearly for membership.
    /// An entry's position here is the index `draw::winner_index` selects.
    pub tickets: Vec<TicketEntry>,
    /// Lamports held in custody for ticket holders or the winner
    pub pot: u64,
    pub pending_winner: Option<Pubkey>,
    pub pending_prize: u64,
    pub paid_out: bool,
    /// Last drawn winner, kept after the prize is claimed
    pub winner: Option<Pubkey>,
}

impl Sealed for Vault {}

impl IsInitialized for Vault {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Vault {
    /// Account size, reserving room for `MAX_TICKETS` entries
    pub const LEN: usize = BOOL // is_initialized
        + 1 // bump
        + PUBKEY // authority
        + U64 // ticket_price
        + U32 // max_tickets
        + I64 // created_at
        + TAG + I64 // end_time
        + 1 // status
        + U32 // ticket_count
        + U32 + MAX_TICKETS * TICKET_ENTRY_LEN // tickets
        + U64 // pot
        + TAG + PUBKEY // pending_winner
        + U64 // pending_prize
        + BOOL // paid_out
        + TAG + PUBKEY; // winner

    /// Build a fresh, empty vault. Inputs are validated before anything is allocated.
    pub fn new(
        authority: Pubkey,
        bump: u8,
        ticket_price: u64,
        max_tickets: u32,
        duration_seconds: Option<i64>,
        now: UnixTimestamp,
    ) -> Result<Self, RaffleError> {
        if ticket_price == 0 {
            return Err(RaffleError::InvalidTicketPrice);
        }

        let end_time = match duration_seconds {
            Some(duration) if duration <= 0 => return Err(RaffleError::InvalidDuration),
            Some(duration) => Some(now.checked_add(duration).ok_or(RaffleError::MathOverflow)?),
            None => None,
        };

        Ok(Self {
            is_initialized: true,
            bump,
            authority,
            ticket_price,
            max_tickets: max_tickets.clamp(1, MAX_TICKETS as u32),
            created_at: now,
            end_time,
            status: VaultStatus::Open,
            ticket_count: 0,
            tickets: Vec::new(),
            pot: 0,
            pending_winner: None,
            pending_prize: 0,
            paid_out: false,
            winner: None,
        })
    }

    /// Whether entries and exits are allowed at `now`
    pub fn is_accepting(&self, now: UnixTimestamp) -> bool {
        self.status == VaultStatus::Open && self.end_time.map_or(true, |end| now < end)
    }

    pub fn has_ticket(&self, buyer: &Pubkey) -> bool {
        self.position_of(buyer).is_some()
    }

    fn position_of(&self, buyer: &Pubkey) -> Option<usize> {
        self.tickets.iter().position(|entry| entry.buyer == *buyer)
    }

    /// Buy a ticket for `buyer`. Returns the lamports the caller must move into custody.
    pub fn enter(&mut self, buyer: Pubkey, now: UnixTimestamp) -> Result<u64, RaffleError> {
        if !self.is_accepting(now) {
            return Err(RaffleError::VaultClosed);
        }
        if self.ticket_count >= self.max_tickets || self.tickets.len() >= MAX_TICKETS {
            return Err(RaffleError::MaxTicketsReached);
        }
        if self.has_ticket(&buyer) {
            return Err(RaffleError::DuplicateEntry);
        }

        let pot = self
            .pot
            .checked_add(self.ticket_price)
            .ok_or(RaffleError::MathOverflow)?;
        let ticket_count = self
            .ticket_count
            .checked_add(1)
            .ok_or(RaffleError::MathOverflow)?;

        self.tickets.push(TicketEntry {
            buyer,
            purchased_at: now,
        });
        self.ticket_count = ticket_count;
        self.pot = pot;

        Ok(self.ticket_price)
    }

    /// Give back `buyer`'s ticket. Returns the lamports to refund.
    ///
    /// Remaining entries keep their relative order.
    pub fn exit(&mut self, buyer: &Pubkey, now: UnixTimestamp) -> Result<u64, RaffleError> {
        if !self.is_accepting(now) {
            return Err(RaffleError::VaultClosed);
        }
        let index = self.position_of(buyer).ok_or(RaffleError::TicketNotFound)?;

        let pot = self
            .pot
            .checked_sub(self.ticket_price)
            .ok_or(RaffleError::MathOverflow)?;
        let ticket_count = self
            .ticket_count
            .checked_sub(1)
            .ok_or(RaffleError::MathOverflow)?;

        self.tickets.remove(index);
        self.ticket_count = ticket_count;
        self.pot = pot;

        Ok(self.ticket_price)
    }

    /// Draw the winner and park the pot as a pending prize. No lamports move here.
    pub fn finalize(
        &mut self,
        authority: &Pubkey,
        now: UnixTimestamp,
    ) -> Result<(Pubkey, u64), RaffleError> {
        if *authority != self.authority {
            return Err(RaffleError::AuthorityMismatch);
        }
        let end_time = match self.end_time {
            Some(end) if now >= end => end,
            _ => return Err(RaffleError::VaultStillRunning),
        };
        if self.ticket_count == 0 {
            return Err(RaffleError::NoTicketsSold);
        }
        if self.pending_winner.is_some() || self.status == VaultStatus::Finished {
            return Err(RaffleError::WinnerAlreadyChosen);
        }

        let seed = draw::draw_seed(&self.authority, self.ticket_price, self.created_at, end_time);
        let index = draw::winner_index(&seed, u64::from(self.ticket_count));
        let winner = usize::try_from(index)
            .ok()
            .and_then(|i| self.tickets.get(i))
            .map(|entry| entry.buyer)
            .ok_or(RaffleError::NoTicketsSold)?;

        self.pending_winner = Some(winner);
        self.pending_prize = self.pot;
        self.winner = Some(winner);
        self.status = VaultStatus::Finished;

        Ok((winner, self.pending_prize))
    }

    /// Settle the pending prize for `caller`. Returns the lamports to pay out.
    ///
    /// Leaves the vault empty so the authority can cancel it afterwards.
    pub fn claim(&mut self, caller: &Pubkey) -> Result<u64, RaffleError> {
        let pending_winner = self
            .pending_winner
            .ok_or(RaffleError::MissingPendingWinner)?;
        if pending_winner != *caller {
            return Err(RaffleError::NotRecordedWinner);
        }
        if self.pending_prize == 0 {
            return Err(RaffleError::NothingToPayout);
        }

        let prize = self.pending_prize;
        self.pending_winner = None;
        self.pending_prize = 0;
        self.pot = 0;
        self.ticket_count = 0;
        self.tickets.clear();
        self.paid_out = true;

        Ok(prize)
    }

    /// Cancel is only allowed for the authority, and only once custody is empty
    pub fn ensure_cancellable(&self, authority: &Pubkey) -> Result<(), RaffleError> {
        if *authority != self.authority {
            return Err(RaffleError::AuthorityMismatch);
        }
        if self.ticket_count != 0 || self.pot != 0 {
            return Err(RaffleError::TicketsStillOutstanding);
        }
        Ok(())
    }

    /// Check the record's bookkeeping invariants
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.tickets.len() != self.ticket_count as usize {
            return Err("ticket_count does not match tickets");
        }
        if self.ticket_count > self.max_tickets || self.tickets.len() > MAX_TICKETS {
            return Err("ticket_count exceeds capacity");
        }
        let distinct = self
            .tickets
            .iter()
            .enumerate()
            .all(|(i, entry)| self.tickets[..i].iter().all(|prev| prev.buyer != entry.buyer));
        if !distinct {
            return Err("duplicate buyer in tickets");
        }

        match self.status {
            VaultStatus::Open => {
                let expected = u64::from(self.ticket_count).checked_mul(self.ticket_price);
                if expected != Some(self.pot) {
                    return Err("pot does not equal ticket_count * ticket_price");
                }
                if self.pending_winner.is_some() || self.pending_prize != 0 {
                    return Err("open vault has a pending prize");
                }
            }
            VaultStatus::Finished => match self.pending_winner {
                Some(_) if self.pot != self.pending_prize => {
                    return Err("pending prize does not equal pot");
                }
                None if self.pot != 0 || self.pending_prize != 0 => {
                    return Err("claimed vault still holds a pot");
                }
                _ => {}
            },
        }
        Ok(())
    }

    /// Deserialize a vault from an account owned by `program_id`
    pub fn load(account: &AccountInfo, program_id: &Pubkey) -> Result<Self, ProgramError> {
        if account.owner != program_id {
            msg!("Vault account must be owned by this program");
            return Err(ProgramError::IncorrectProgramId);
        }

        let data = account.try_borrow_data()?;
        let vault =
            Self::deserialize(&mut &data[..]).map_err(|_| ProgramError::InvalidAccountData)?;
        if !vault.is_initialized {
            return Err(RaffleError::VaultNotInitialized.into());
        }
        Ok(vault)
    }

    /// Serialize into the account, refusing to persist a record that breaks its invariants
    pub fn save(&self, account: &AccountInfo) -> ProgramResult {
        if let Err(reason) = self.check_invariants() {
            msg!("Refusing to save vault: {}", reason);
            return Err(ProgramError::InvalidAccountData);
        }

        let mut data = account.try_borrow_mut_data()?;
        let mut dst = &mut data[..];
        self.serialize(&mut dst)
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE: u64 = 500_000_000;
    const START: UnixTimestamp = 1_700_000_000;
    const HOUR: i64 = 3600;

    fn open_vault(max_tickets: u32) -> Vault {
        Vault::new(Pubkey::new_unique(), 255, PRICE, max_tickets, Some(HOUR), START).unwrap()
    }

    fn filled_vault(buyers: &[Pubkey]) -> Vault {
        let mut vault = open_vault(buyers.len() as u32);
        for buyer in buyers {
            vault.enter(*buyer, START + 1).unwrap();
        }
        vault
    }

    #[test]
    fn new_vault_is_open_and_empty() {
        let authority = Pubkey::new_unique();
        let vault = Vault::new(authority, 7, PRICE, 5, Some(HOUR), START).unwrap();

        assert!(vault.is_initialized);
        assert_eq!(vault.authority, authority);
        assert_eq!(vault.bump, 7);
        assert_eq!(vault.status, VaultStatus::Open);
        assert_eq!(vault.ticket_count, 0);
        assert_eq!(vault.pot, 0);
        assert_eq!(vault.created_at, START);
        assert_eq!(vault.end_time, Some(START + HOUR));
        assert!(vault.pending_winner.is_none());
        assert!(vault.check_invariants().is_ok());
    }

    #[test]
    fn new_vault_without_duration_never_expires() {
        let vault = Vault::new(Pubkey::new_unique(), 1, PRICE, 5, None, START).unwrap();
        assert_eq!(vault.end_time, None);
        assert!(vault.is_accepting(i64::MAX));
    }

    #[test]
    fn new_vault_rejects_bad_inputs() {
        let authority = Pubkey::new_unique();
        assert_eq!(
            Vault::new(authority, 1, 0, 5, Some(HOUR), START),
            Err(RaffleError::InvalidTicketPrice)
        );
        assert_eq!(
            Vault::new(authority, 1, PRICE, 5, Some(0), START),
            Err(RaffleError::InvalidDuration)
        );
        assert_eq!(
            Vault::new(authority, 1, PRICE, 5, Some(-10), START),
            Err(RaffleError::InvalidDuration)
        );
    }

    #[test]
    fn max_tickets_is_clamped_to_capacity() {
        assert_eq!(open_vault(0).max_tickets, 1);
        assert_eq!(open_vault(10_000).max_tickets, MAX_TICKETS as u32);
    }

    #[test]
    fn entries_accumulate_pot() {
        let mut vault = open_vault(5);
        for n in 1..=3u32 {
            let price = vault.enter(Pubkey::new_unique(), START + 10).unwrap();
            assert_eq!(price, PRICE);
            assert_eq!(vault.ticket_count, n);
            assert_eq!(vault.pot, u64::from(n) * PRICE);
        }
        assert!(vault.check_invariants().is_ok());
    }

    #[test]
    fn duplicate_entry_is_rejected() {
        let mut vault = open_vault(5);
        let buyer = Pubkey::new_unique();
        vault.enter(buyer, START).unwrap();
        vault.enter(Pubkey::new_unique(), START).unwrap();

        assert_eq!(vault.enter(buyer, START), Err(RaffleError::DuplicateEntry));
        assert_eq!(vault.ticket_count, 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut vault = open_vault(2);
        vault.enter(Pubkey::new_unique(), START).unwrap();
        vault.enter(Pubkey::new_unique(), START).unwrap();

        assert_eq!(
            vault.enter(Pubkey::new_unique(), START),
            Err(RaffleError::MaxTicketsReached)
        );
    }

    #[test]
    fn entry_and_exit_close_at_deadline() {
        let buyer = Pubkey::new_unique();
        let mut vault = open_vault(5);
        vault.enter(buyer, START).unwrap();

        let deadline = START + HOUR;
        assert_eq!(
            vault.enter(Pubkey::new_unique(), deadline),
            Err(RaffleError::VaultClosed)
        );
        assert_eq!(vault.exit(&buyer, deadline), Err(RaffleError::VaultClosed));
    }

    #[test]
    fn exit_refunds_and_keeps_order() {
        let buyers: Vec<Pubkey> = (0..4).map(|_| Pubkey::new_unique()).collect();
        let mut vault = filled_vault(&buyers);

        let refund = vault.exit(&buyers[1], START + 5).unwrap();

        assert_eq!(refund, PRICE);
        assert_eq!(vault.ticket_count, 3);
        assert_eq!(vault.pot, 3 * PRICE);
        assert!(!vault.has_ticket(&buyers[1]));
        let order: Vec<Pubkey> = vault.tickets.iter().map(|e| e.buyer).collect();
        assert_eq!(order, vec![buyers[0], buyers[2], buyers[3]]);
        assert!(vault.check_invariants().is_ok());
    }

    #[test]
    fn exit_without_ticket_fails() {
        let mut vault = open_vault(5);
        vault.enter(Pubkey::new_unique(), START).unwrap();
        assert_eq!(
            vault.exit(&Pubkey::new_unique(), START),
            Err(RaffleError::TicketNotFound)
        );
    }

    #[test]
    fn finalize_checks_preconditions_in_order() {
        let buyers = [Pubkey::new_unique()];
        let mut vault = filled_vault(&buyers);
        let authority = vault.authority;
        let after = START + HOUR;

        assert_eq!(
            vault.finalize(&Pubkey::new_unique(), after),
            Err(RaffleError::AuthorityMismatch)
        );
        assert_eq!(
            vault.finalize(&authority, after - 1),
            Err(RaffleError::VaultStillRunning)
        );

        let mut empty = open_vault(3);
        let empty_authority = empty.authority;
        assert_eq!(
            empty.finalize(&empty_authority, after),
            Err(RaffleError::NoTicketsSold)
        );

        vault.finalize(&authority, after).unwrap();
        assert_eq!(
            vault.finalize(&authority, after + 100),
            Err(RaffleError::WinnerAlreadyChosen)
        );
    }

    #[test]
    fn non_expiring_vault_cannot_finalize() {
        let mut vault = Vault::new(Pubkey::new_unique(), 1, PRICE, 5, None, START).unwrap();
        let authority = vault.authority;
        vault.enter(Pubkey::new_unique(), START).unwrap();
        assert_eq!(
            vault.finalize(&authority, i64::MAX),
            Err(RaffleError::VaultStillRunning)
        );
    }

    #[test]
    fn finalize_picks_an_entrant_deterministically() {
        let buyers: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let mut first = filled_vault(&buyers);
        let mut second = first.clone();
        let authority = first.authority;

        let (winner, prize) = first.finalize(&authority, START + HOUR).unwrap();
        let (again, _) = second.finalize(&authority, START + 10 * HOUR).unwrap();

        assert!(buyers.contains(&winner));
        assert_eq!(winner, again);
        assert_eq!(prize, 3 * PRICE);
        assert_eq!(first.pending_winner, Some(winner));
        assert_eq!(first.pending_prize, first.pot);
        assert_eq!(first.status, VaultStatus::Finished);
        assert!(first.check_invariants().is_ok());

        let seed = draw::draw_seed(&authority, PRICE, START, START + HOUR);
        let index = draw::winner_index(&seed, 3) as usize;
        assert_eq!(winner, buyers[index]);
    }

    #[test]
    fn finished_vault_refuses_entries() {
        let buyers = [Pubkey::new_unique()];
        let mut vault = filled_vault(&buyers);
        let authority = vault.authority;
        vault.end_time = Some(START + HOUR);
        vault.finalize(&authority, START + HOUR).unwrap();

        vault.end_time = Some(i64::MAX);
        assert_eq!(
            vault.enter(Pubkey::new_unique(), START),
            Err(RaffleError::VaultClosed)
        );
        assert_eq!(vault.exit(&buyers[0], START), Err(RaffleError::VaultClosed));
    }

    #[test]
    fn claim_pays_once() {
        let buyers: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        let mut vault = filled_vault(&buyers);
        let authority = vault.authority;

        assert_eq!(
            vault.claim(&buyers[0]),
            Err(RaffleError::MissingPendingWinner)
        );

        let (winner, _) = vault.finalize(&authority, START + HOUR).unwrap();
        let loser = buyers.iter().find(|b| **b != winner).unwrap();
        assert_eq!(vault.claim(loser), Err(RaffleError::NotRecordedWinner));

        assert_eq!(vault.claim(&winner), Ok(3 * PRICE));
        assert!(vault.pending_winner.is_none());
        assert_eq!(vault.pending_prize, 0);
        assert_eq!(vault.pot, 0);
        assert!(vault.paid_out);
        assert_eq!(vault.winner, Some(winner));
        assert_eq!(vault.status, VaultStatus::Finished);
        assert!(vault.check_invariants().is_ok());

        assert_eq!(vault.claim(&winner), Err(RaffleError::MissingPendingWinner));
    }

    #[test]
    fn claim_with_zero_prize_is_rejected() {
        let winner = Pubkey::new_unique();
        let mut vault = open_vault(3);
        vault.status = VaultStatus::Finished;
        vault.pending_winner = Some(winner);
        vault.winner = Some(winner);
        assert!(vault.check_invariants().is_ok());

        let before = vault.clone();
        assert_eq!(vault.claim(&winner), Err(RaffleError::NothingToPayout));
        assert_eq!(vault, before);
    }

    #[test]
    fn cancel_requires_authority_and_empty_vault() {
        let mut vault = open_vault(3);
        let authority = vault.authority;
        assert_eq!(vault.ensure_cancellable(&authority), Ok(()));
        assert_eq!(
            vault.ensure_cancellable(&Pubkey::new_unique()),
            Err(RaffleError::AuthorityMismatch)
        );

        vault.enter(Pubkey::new_unique(), START).unwrap();
        assert_eq!(
            vault.ensure_cancellable(&authority),
            Err(RaffleError::TicketsStillOutstanding)
        );
    }

    #[test]
    fn claimed_vault_can_be_cancelled() {
        let buyers = [Pubkey::new_unique(), Pubkey::new_unique()];
        let mut vault = filled_vault(&buyers);
        let authority = vault.authority;
        let (winner, _) = vault.finalize(&authority, START + HOUR).unwrap();
        vault.claim(&winner).unwrap();

        assert_eq!(vault.ensure_cancellable(&authority), Ok(()));
    }

    #[test]
    fn invariant_check_catches_broken_books() {
        let mut vault = filled_vault(&[Pubkey::new_unique(), Pubkey::new_unique()]);
        vault.pot -= 1;
        assert!(vault.check_invariants().is_err());

        let mut vault = filled_vault(&[Pubkey::new_unique()]);
        vault.ticket_count = 2;
        assert!(vault.check_invariants().is_err());

        let buyer = Pubkey::new_unique();
        let mut vault = filled_vault(&[buyer, Pubkey::new_unique()]);
        vault.tickets[1].buyer = buyer;
        assert!(vault.check_invariants().is_err());
    }

    #[test]
    fn full_vault_fits_in_account() {
        let mut vault = open_vault(MAX_TICKETS as u32);
        for _ in 0..MAX_TICKETS {
            vault.enter(Pubkey::new_unique(), START).unwrap();
        }
        let authority = vault.authority;
        vault.finalize(&authority, START + HOUR).unwrap();

        let bytes = borsh::to_vec(&vault).unwrap();
        assert_eq!(bytes.len(), Vault::LEN);

        let mut account_data = vec![0u8; Vault::LEN];
        account_data[..bytes.len()].copy_from_slice(&bytes);
        let decoded = Vault::deserialize(&mut &account_data[..]).unwrap();
        assert_eq!(decoded, vault);
    }
}
