//! Response synthesizer.
//!
//! Maps a user submission to the final assistant content and citations.
//! No side effects and no external calls: the image and search branches
//! are deterministic templates, the generic branch picks one of a small
//! pool of canned long-form answers through the injected random source.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{ChatError, ChatResult};
use crate::types::{Citation, SendOptions};

/// A synthesized final answer
#[derive(Debug, Clone)]
pub struct SynthesizedResponse {
    /// Final message content
    pub content: String,
    /// Sources, present only for search-backed answers
    pub citations: Vec<Citation>,
}

/// Synthesize the final response for a submission.
///
/// The system prompt travels with the call for parity with a real model
/// backend, but the canned templates do not consume it.
pub fn synthesize(
    input: &str,
    _system_prompt: &str,
    options: &SendOptions,
    rng: &mut impl Rng,
) -> ChatResult<SynthesizedResponse> {
    if let Some(url) = &options.search_url {
        if url.trim().is_empty() {
            return Err(ChatError::SynthesisFailed(
                "search URL must not be blank".to_string(),
            ));
        }
    }

    if !options.images.is_empty() {
        return Ok(SynthesizedResponse {
            content: image_response(options.images.len()),
            citations: Vec::new(),
        });
    }

    if options.wants_search() {
        return Ok(SynthesizedResponse {
            content: search_response(input, options.search_url.as_deref()),
            citations: citations_for(options.search_url.as_deref()),
        });
    }

    let content = GENERIC_RESPONSES
        .choose(rng)
        .expect("response pool is not empty")
        .to_string();
    Ok(SynthesizedResponse {
        content,
        citations: Vec::new(),
    })
}

fn image_response(count: usize) -> String {
    format!(
        "I can see the {count} image{s} you attached. Here is what stands out:\n\n\
         The pictures share a coherent visual theme, with several elements that together \
         tell a complete story.\n\n\
         From a technical point of view they have these qualities:\n\n\
         1. **Composition**: the layout is balanced and the subject is clear\n\
         2. **Color**: the palette is consistent and visually striking\n\
         3. **Detail**: the frames are rich in information\n\n\
         If you have a more specific question about them, just ask!",
        count = count,
        s = if count == 1 { "" } else { "s" },
    )
}

fn search_response(input: &str, search_url: Option<&str>) -> String {
    let source = match search_url {
        Some(url) => format!("a search of {url}"),
        None => "a web search".to_string(),
    };
    format!(
        "Based on {source}, here is what I found:\n\n\
         \"{input}\" is a good question. The search surfaced a few key points:\n\n\
         1. **Core concept**: the topic spans several areas, from foundational theory \
         to practical application.\n\n\
         2. **Recent developments**: there have been notable advances in this area \
         recently, pointing at new directions.\n\n\
         3. **In practice**: multiple documented cases show the approach working well.\n\n\
         The sources below back these findings up."
    )
}

fn citations_for(search_url: Option<&str>) -> Vec<Citation> {
    match search_url {
        Some(url) => vec![
            Citation {
                title: format!("{url} - overview"),
                url: url.to_string(),
            },
            Citation {
                title: format!("{url} - details"),
                url: format!("{url}/details"),
            },
        ],
        None => vec![
            Citation {
                title: "Wikipedia - related entry".to_string(),
                url: "https://wikipedia.org".to_string(),
            },
            Citation {
                title: "Google Scholar - academic papers".to_string(),
                url: "https://scholar.google.com".to_string(),
            },
            Citation {
                title: "Stack Overflow - technical discussion".to_string(),
                url: "https://stackoverflow.com".to_string(),
            },
        ],
    }
}

/// Pool of canned long-form answers for submissions without modifiers
const GENERIC_RESPONSES: [&str; 3] = [
    "Multimodal models are AI systems that understand and combine several kinds of data \
     (modalities such as text, images, audio and video). By learning the relationships and \
     complementary signals between modalities, they map everything into one joint embedding \
     space and gain a more complete picture of the world.\n\n\
     The core mechanism has three parts: each modality is encoded by a dedicated encoder; \
     cross-modal attention or a fusion network aligns and merges the per-modality features; \
     and the unified representation then drives tasks like visual question answering, \
     text-to-image generation and cross-modal retrieval.\n\n\
     Their arrival marks a step from single-sense understanding toward something closer to \
     human multi-sense perception.",
    "Looking at your question, I would break it down along these lines:\n\n\
     1. **Theory**: the field already has a fairly mature framework that gives practice a \
     solid footing.\n\n\
     2. **Practice**: there are several documented success stories to draw on, which show \
     the approach holds up.\n\n\
     3. **Outlook**: as the tooling matures, more becomes possible; expect further \
     innovation here.\n\n\
     If you want more concrete advice, feel free to ask a follow-up.",
    "That is a good question. Let me walk through it:\n\n\
     First we need to pin down the core of the problem. It touches several layers at once: \
     the underlying theory, hands-on experience, and where things are heading. Each layer \
     carries its own weight.\n\n\
     In practice the most effective route is usually an incremental one. It keeps every \
     step controllable and leaves room to change course early instead of going down a \
     dead end.\n\n\
     I hope that helps. Ask away if anything is still unclear!",
];
