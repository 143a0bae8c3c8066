//! DWARF register numbers of ARM.
//!
//! See *DWARF for the ARM Architecture*, table 1.

/// First general purpose register (`R0` through `R15` follow).
pub const R0: u64 = 0;

/// Frame pointer (also `R11`).
pub const BP: u64 = 11;

/// Stack pointer (also `R13`).
pub const SP: u64 = 13;

/// Link register (also `R14`).
pub const LR: u64 = 14;

/// Program counter (also `R15`).
pub const PC: u64 = 15;

/// First single-precision floating point register (`S0` through `S31`
/// follow).
pub const S0: u64 = 64;

/// Highest register number.
pub const MAX_REG_NUM: u64 = S0 + 31;

/// Returns the name of a register.
///
/// Numbers without a register get a placeholder name (`unknownN`).
pub fn name(id: u64) -> String {
    match id {
        R0..=PC => format!("R{id}"),
        S0..=MAX_REG_NUM => format!("S{}", id - S0),
        _ => format!("unknown{id}"),
    }
}

/// Returns the number of a register, given its name (case-insensitive).
///
/// Placeholder names returned by [name] are accepted.
pub fn number_of(name: &str) -> Option<u64> {
    let name = name.to_ascii_lowercase();

    match name.as_str() {
        "bp" => return Some(BP),
        "sp" => return Some(SP),
        "lr" => return Some(LR),
        "pc" => return Some(PC),
        _ => (),
    }

    if let Some(n) = name.strip_prefix("unknown") {
        return n.parse().ok();
    }

    let (range, n) = if let Some(n) = name.strip_prefix('r') {
        (R0..=PC, n)
    } else if let Some(n) = name.strip_prefix('s') {
        (S0..=MAX_REG_NUM, n)
    } else {
        return None;
    };

    // reject `r+1`, `r01`, ...
    let canonical = !n.is_empty()
        && n.bytes().all(|b| b.is_ascii_digit())
        && (n.len() == 1 || !n.starts_with('0'));

    if !canonical {
        return None;
    }

    let id = n.parse::<u64>().ok()?.checked_add(*range.start())?;

    range.contains(&id).then_some(id)
}
