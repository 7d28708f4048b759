//! Startup banner (SPLIT-LEDGER) and the colour scheme for money on the console.
//!
//! Credits print in mint, debts in coral, settled balances dimmed.

use crate::domain::{display_name, Cents};
use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};
use std::path::Path;

/// Mint (#3ddc97). Owed to the member.
const MINT: (u8, u8, u8) = (0x3d, 0xdc, 0x97);
/// Ocean blue (#256eff).
const OCEAN: (u8, u8, u8) = (0x25, 0x6e, 0xff);
/// Coral (#ff6b6b). Member owes.
const CORAL: (u8, u8, u8) = (0xff, 0x6b, 0x6b);
const SLATE: (u8, u8, u8) = (0x8a, 0x94, 0xa6);

/// What the console is running against, shown under the banner.
pub struct Session<'a> {
    pub store: &'a str,
    pub location: &'a Path,
    pub member: Option<&'a str>,
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb { r, g, b }
}

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

fn amount_rgb(amount: Cents) -> (u8, u8, u8) {
    if amount.abs() < Cents::ONE {
        SLATE
    } else if amount.is_positive() {
        MINT
    } else {
        CORAL
    }
}

/// `+12.50` for credits, `-12.50` for debts, `0.00` when settled.
fn signed(amount: Cents) -> String {
    if amount.is_positive() {
        format!("+{}", amount)
    } else {
        amount.to_string()
    }
}

fn status_line(session: &Session<'_>) -> String {
    let mut line = format!(
        "v{}  {} store at {}",
        env!("CARGO_PKG_VERSION"),
        session.store,
        session.location.display()
    );
    match session.member {
        Some(m) => line.push_str(&format!("  acting as {}", display_name(m))),
        None => line.push_str("  no acting member set"),
    }
    line
}

/// Prints "SPLIT-LEDGER" in ASCII art, mint to ocean, then the session line.
/// Falls back to a plain title line if the font cannot render.
pub fn print_welcome(session: &Session<'_>) {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("SPLIT-LEDGER").map(|figure| figure.to_string()))
        .unwrap_or_else(|| "SPLIT-LEDGER".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let _ = out.execute(SetForegroundColor(rgb(lerp_rgb(MINT, OCEAN, t))));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let _ = out.execute(SetForegroundColor(rgb(SLATE)));
    let _ = out.execute(Print(format!("{}\r\n", status_line(session))));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

/// One balance row: member name padded, amount coloured by direction.
pub fn print_balance_row(member: &str, amount: Cents) {
    let mut out = stdout();
    let _ = out.execute(Print(format!("  {:<32} ", member)));
    let _ = out.execute(SetForegroundColor(rgb(amount_rgb(amount))));
    let _ = out.execute(Print(format!("{:>12}\r\n", signed(amount))));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_hits_both_ends() {
        assert_eq!(lerp_rgb(MINT, OCEAN, 0.0), MINT);
        assert_eq!(lerp_rgb(MINT, OCEAN, 1.0), OCEAN);
    }

    #[test]
    fn amounts_are_coloured_by_direction() {
        assert_eq!(amount_rgb(Cents::new(1250)), MINT);
        assert_eq!(amount_rgb(Cents::new(-1)), CORAL);
        assert_eq!(amount_rgb(Cents::ZERO), SLATE);
        assert_eq!(signed(Cents::new(1250)), "+12.50");
        assert_eq!(signed(Cents::new(-1250)), "-12.50");
        assert_eq!(signed(Cents::ZERO), "0.00");
    }

    #[test]
    fn status_line_names_store_and_member() {
        let session = Session {
            store: "sqlite",
            location: Path::new("./data/ledger.db"),
            member: Some("ana@example.com"),
        };
        let line = status_line(&session);
        assert!(line.contains("sqlite store at ./data/ledger.db"));
        assert!(line.ends_with("acting as ana"));

        let anonymous = Session { member: None, ..session };
        assert!(status_line(&anonymous).ends_with("no acting member set"));
    }
}
