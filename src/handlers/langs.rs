//! `kode langs`: list runnable languages.

use anyhow::Result;

use crate::config::Config;
use crate::languages;
use crate::printer::TextPrinter;
use crate::transport::{HttpTransport, Transport};

pub async fn run(cfg: &Config, local: bool) -> Result<()> {
    if local {
        print!("{}", local_table());
        return Ok(());
    }
    let transport = HttpTransport::from_config(cfg)?;
    let table = transport.languages().await?;
    println!("{}", table.trim_end());
    Ok(())
}

fn local_table() -> String {
    let header = TextPrinter { color: Some("cyan") };
    let mut out = format!("{}\n", header.format(&format!("{:<8}{:<10}{:<10}{}", "EXT", "LANGUAGE", "MODE", "VERSION")));
    for p in languages::supported() {
        out.push_str(&format!(
            "{:<8}{:<10}{:<10}{}\n",
            format!(".{}", p.id),
            p.language,
            p.display_mode,
            p.default_version.unwrap_or("-")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_table_lists_every_profile() {
        let table = local_table();
        assert_eq!(table.lines().count(), languages::supported().len() + 1);
        assert!(table.contains(".rb     ruby      ruby      2.3.0"));
    }
}
