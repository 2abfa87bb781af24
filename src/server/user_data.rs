//! `io_uring` `user_data` tagging.
//!
//! The teacher packs an opcode, a direction bit, and a connection id into
//! the 64-bit `user_data` field every SQE carries. This server has no
//! backend leg and so no direction dimension — a connection only ever
//! recvs from or sends to the one client socket — but it gains a fourth
//! operation, `DetachWake`, for the cross-thread wakeup a detached
//! continuation uses to deliver its response (§4.5). `DetachWake` is not
//! tied to a connection id; callers pack it with [`NO_ID`].

const OPCODE_BITS: u64 = 2;
const ID_BITS: u64 = 64 - OPCODE_BITS;
const OPCODE_MASK: u64 = (1 << OPCODE_BITS) - 1;
const ID_MASK: u64 = (1 << ID_BITS) - 1;

/// Sentinel id for operations with no associated connection (`DetachWake`).
pub const NO_ID: usize = (ID_MASK) as usize;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operation {
    Accept = 0,
    Recv = 1,
    Send = 2,
    DetachWake = 3,
}

#[inline]
pub fn pack_user_data(id: usize, op: Operation) -> u64 {
    debug_assert!((id as u64 & !ID_MASK) == 0, "connection id exceeds 62 bits");
    ((id as u64 & ID_MASK) << OPCODE_BITS) | (op as u64 & OPCODE_MASK)
}

#[inline]
pub fn unpack_user_data(tag: u64) -> (usize, Operation) {
    let opcode = (tag & OPCODE_MASK) as u8;
    let id = ((tag >> OPCODE_BITS) & ID_MASK) as usize;
    let op = match opcode {
        0 => Operation::Accept,
        1 => Operation::Recv,
        2 => Operation::Send,
        3 => Operation::DetachWake,
        _ => unreachable!("opcode is masked to 2 bits"),
    };
    (id, op)
}
