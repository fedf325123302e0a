//! # Builtin
//!
//! Patch tables removing the traps which keep TUN devices from working on FRITZ!OS MIPS kernels.
//!
//! The vendor kernel traps when a socket buffer without owning socket passes `ip_forward`, `ip6_forward` or the
//! receive path. The patches replace the load of `skb->sk` (or the trap after it) so the check never fires.
//!
//! The first version a list no longer applies to is used as its upper bound, so later bugfix releases of an older
//! line are still covered.

use crate::code::mips::{self, Register};
use crate::patch::{PatchDescriptor, PatchList, WordMatcher};
use crate::version::{VersionBound, VersionRange};

/// Trap code used by the vendor checks
const TRAP_CODE: u16 = 12;

/// `lw <any>, sk_offset(a0)`, loading `skb->sk` from the first argument
fn load_sk(sk_offset: u16) -> WordMatcher {
    mips::any_rt(mips::lw(Register::Zero, sk_offset, Register::A0))
}

/// `tne zero, <any>, 12`
fn sk_trap() -> WordMatcher {
    mips::any_rt(mips::tne(Register::Zero, Register::Zero, TRAP_CODE))
}

/// Replaces the load of `skb->sk` with `addiu v0, zero, 0`
fn clear_sk(symbol: &str, search_limit: usize, sk_offset: u16) -> PatchDescriptor {
    PatchDescriptor::new(
        symbol,
        search_limit,
        load_sk(sk_offset),
        mips::addiu(Register::V0, Register::Zero, 0),
    )
}

/// Replaces the trap following the load of `skb->sk` with a `nop`
fn drop_trap(symbol: &str, search_limit: usize, sk_offset: u16) -> PatchDescriptor {
    PatchDescriptor::new(symbol, search_limit, load_sk(sk_offset), mips::NOP)
        .with_verify(1, sk_trap())
        .with_patch_offset(1)
}

/// Patch lists for TUN devices on 7490/75x0 models.
///
/// `sk_offset` is the offset of the `sk` member in `struct sk_buff` of the target kernel.
pub fn tun_device_lists(sk_offset: u16) -> Vec<PatchList> {
    vec![
        PatchList::new(
            "patches for TUN device since FRITZ!OS 07.08",
            VersionRange::starting_at(VersionBound::new(7, 8, 0)),
            vec![
                clear_sk("ip_forward", 12, sk_offset),
                clear_sk("ip6_forward", 10, sk_offset).with_search_start(15),
            ],
        ),
        PatchList::new(
            "patches for TUN device from FRITZ!OS 06.98 to FRITZ!OS 07.08",
            VersionRange::new(VersionBound::new(6, 98, 0), VersionBound::new(7, 8, 0)),
            vec![
                clear_sk("ip_forward", 10, sk_offset),
                drop_trap("netif_receive_skb", 10, sk_offset),
                drop_trap("__netif_receive_skb", 8, sk_offset),
            ],
        ),
    ]
}
