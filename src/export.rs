//! CSV rendering of the entries table for the admin export.

use crate::db::EntryRow;

/// Render entries as CSV with a header row. Fields containing commas,
/// quotes, or newlines are quoted per RFC 4180.
pub fn entries_to_csv(entries: &[EntryRow]) -> String {
    let mut out = String::from("id,handle,wallet,number,winner,rank,prize,created_at\n");
    for e in entries {
        let rank = e.rank.map(|r| r.to_string()).unwrap_or_default();
        let prize = e.prize.map(|p| p.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            e.id,
            escape(&e.handle),
            escape(&e.wallet),
            e.number,
            e.winner,
            rank,
            prize,
            e.created_at.to_rfc3339(),
        ));
    }
    out
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
