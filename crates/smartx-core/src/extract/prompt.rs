//! Instruction prompt for the completion service.

use std::fmt::Write;

use super::{CONTRACTS, StageContract};

/// Line delimiting the page text from the instructions.
const DELIMITER: &str = "=========";

/// Builds the extraction prompt around one page of text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    contracts: &'static [StageContract],
    max_page_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            contracts: CONTRACTS,
            max_page_chars: 12_000,
        }
    }

    /// Truncate page text beyond this many characters (0 = no limit).
    pub fn with_max_page_chars(mut self, max: usize) -> Self {
        self.max_page_chars = max;
        self
    }

    pub fn build(&self, page: &str) -> String {
        let page = truncate_chars(page, self.max_page_chars);
        let mut prompt = String::new();

        prompt.push_str("You are a text processing agent working with an invoice document.\n\n");
        prompt.push_str(
            "Identify the supply chain stage of the document. It is exactly one of: \
             transportation or packaging.\n",
        );

        for (i, contract) in self.contracts.iter().enumerate() {
            let lead = if i == 0 { "If" } else { "Else if" };
            let _ = writeln!(
                prompt,
                "\n{} the stage is {}, return the following.",
                lead, contract.stage
            );
            prompt.push_str(
                "If any of the following fields are not in the document, give null as the value \
                 for that field; never leave a field out.\n",
            );
            prompt.push_str(
                "Return the answer as a single JSON object, with fields separated by commas, \
                 with exactly these fields:\n",
            );
            for field in contract.fields {
                let _ = writeln!(prompt, "- \"{}\" {}", field.name, field.kind.prompt_label());
            }
        }

        prompt.push_str(
            "\nDo not infer any data based on previous training; strictly use only the source \
             text given below as input.\n",
        );
        prompt.push_str("Return only the JSON object, with no commentary.\n");
        let _ = write!(prompt, "{DELIMITER}\n{page}\n{DELIMITER}\n");

        prompt
    }
}

/// Build the prompt with default settings.
pub fn build_prompt(page: &str) -> String {
    PromptBuilder::new().build(page)
}

fn truncate_chars(text: &str, max: usize) -> &str {
    if max == 0 {
        return text;
    }
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
