//! Deterministic canned-answer mode for demos and tests
//! Replays a fixed markdown report word by word with synthetic delays

use std::time::Duration;

use once_cell::sync::Lazy;

use crate::providers::completion::FragmentStream;

pub const MOCK_ANSWER: &str = r#"## Federal Funds Rate

The federal funds rate is the interest rate at which depository institutions lend reserve balances to each other overnight. It is the Federal Reserve's primary policy instrument, steered through a target range set by the FOMC.

### How the target is set

- The **FOMC** meets eight times a year to set the target range.
- The effective rate is kept inside the range with **interest on reserve balances** and the **overnight reverse repo facility**.
- Changes propagate to money markets within days and to lending rates over months.

### Why it matters

1. **Borrowing costs**: mortgages, corporate credit, and consumer loans reprice off short rates.
2. **Asset prices**: discount rates move with the policy path.
3. **Exchange rates**: rate differentials shift capital flows and the dollar.

*This is a canned demonstration answer; no live data was consulted.*"#;

const MOCK_DELTA_DELAY: Duration = Duration::from_millis(10);

static MOCK_CHUNKS: Lazy<Vec<String>> = Lazy::new(|| word_chunks(MOCK_ANSWER));

/// Splits text into word-sized chunks, each carrying its trailing
/// whitespace, so concatenating the chunks reconstructs the input exactly
/// and the chunk count equals the word count.
pub fn word_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut at_boundary = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            at_boundary = true;
        } else if at_boundary {
            chunks.push(std::mem::take(&mut current));
            at_boundary = false;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// One fragment per word of the canned answer, paced like a live stream.
pub fn mock_fragments() -> FragmentStream {
    Box::pin(async_stream::stream! {
        for chunk in MOCK_CHUNKS.iter() {
            tokio::time::sleep(MOCK_DELTA_DELAY).await;
            yield Ok(chunk.clone());
        }
    })
}
