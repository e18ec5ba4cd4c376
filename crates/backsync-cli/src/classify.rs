//! `backsync classify` — classify a title/description from the command
//! line. Useful for checking what the briefing pipeline would do with a
//! record.

use backsync_core::split_csv;
use backsync_tracker::{rule_based, Classification, Classifier, Provider};

use crate::args::parse_flags;
use crate::runtime;

const FLAGS: [&str; 5] = ["--title", "--body", "--labels", "--provider", "--model"];

pub fn run(args: &[String]) -> Result<String, String> {
    let flags = parse_flags("classify", args, &FLAGS)?;
    let Some(title) = flags.get("--title") else {
        return Err("classify requires --title".to_string());
    };
    let body = flags.get("--body").cloned().unwrap_or_default();
    let labels = flags
        .get("--labels")
        .map(|raw| split_csv(raw))
        .unwrap_or_default();

    let result = match flags.get("--provider") {
        Some(raw) => {
            let provider = Provider::parse(raw)
                .ok_or_else(|| format!("unknown provider: {raw:?}"))?;
            let classifier = Classifier::new(provider, flags.get("--model").cloned(), None, None)
                .map_err(|err| err.to_string())?;
            runtime()?.block_on(classifier.classify(title, &body, &labels))
        }
        None => rule_based(title, &body, &labels),
    };

    Ok(render(&result))
}

fn render(result: &Classification) -> String {
    format!(
        "Category: {}\nPriority: {}\nSummary: {}\nConfidence: {:.2}\nReasoning: {}\n",
        result.category.as_str(),
        result.priority.as_str(),
        result.summary,
        result.confidence,
        result.reasoning,
    )
}
