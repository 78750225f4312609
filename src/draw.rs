// Winner selection for the raffle vault
use arrayref::array_ref;
use solana_program::{clock::UnixTimestamp, keccak, pubkey::Pubkey};

/// Digest over the fields fixed when the vault was created.
///
/// Layout: `authority || ticket_price (LE) || created_at (LE) || end_time (LE)`.
/// Nothing that changes after creation feeds the digest, so resubmitting a
/// finalize at a later slot draws the same index for the same ticket count.
///
/// The authority chooses every input before tickets sell and could grind
/// them to skew the draw.
pub fn draw_seed(
    authority: &Pubkey,
    ticket_price: u64,
    created_at: UnixTimestamp,
    end_time: UnixTimestamp,
) -> [u8; 32] {
    keccak::hashv(&[
        authority.as_ref(),
        &ticket_price.to_le_bytes(),
        &created_at.to_le_bytes(),
        &end_time.to_le_bytes(),
    ])
    .to_bytes()
}

/// Map a seed onto `0..ticket_count` using its first 8 bytes as a LE u64
pub fn winner_index(seed: &[u8; 32], ticket_count: u64) -> u64 {
    if ticket_count == 0 {
        return 0;
    }

    let prefix = u64::from_le_bytes(*array_ref![seed, 0, 8]);
    prefix % ticket_count
}
