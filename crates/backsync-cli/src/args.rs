//! Flag parsing shared by the command handlers.

use std::collections::BTreeMap;

/// Flags that take no value.
const SWITCHES: [&str; 3] = ["--allow-empty", "--force", "--recursive"];

/// Parse `--flag value` pairs (and bare switches) for one command.
///
/// Every flag must be listed in `allowed`; positional arguments are not
/// accepted by any command.
pub fn parse_flags(
    command: &str,
    args: &[String],
    allowed: &[&str],
) -> Result<BTreeMap<String, String>, String> {
    let mut flags: BTreeMap<String, String> = BTreeMap::new();
    let mut i = 0usize;

    while i < args.len() {
        let arg = &args[i];
        if !arg.starts_with("--") || !allowed.contains(&arg.as_str()) {
            return Err(format!("unknown argument for {command}: '{arg}'"));
        }
        if SWITCHES.contains(&arg.as_str()) {
            flags.insert(arg.clone(), "true".to_string());
            i += 1;
            continue;
        }
        let Some(value) = args.get(i + 1) else {
            return Err(format!("flag {arg} requires a value"));
        };
        flags.insert(arg.clone(), value.clone());
        i += 2;
    }

    Ok(flags)
}
