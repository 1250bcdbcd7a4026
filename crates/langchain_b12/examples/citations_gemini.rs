use langchain_b12::{
    citations::create_citation_model,
    genai::ChatGoogleGenAIBuilder,
};
use langchain_core::{ContentBlock, LlmModel, Message, MessageContent};

const MODEL: &str = "gemini-2.0-flash";

const DOCUMENT: &str = "The grass is green. The sky is blue. \
Water boils at 100 degrees Celsius at sea level.";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let model = ChatGoogleGenAIBuilder::from_env(MODEL)
        .expect("GOOGLE_API_KEY or GEMINI_API_KEY must be set")
        .with_temperature(0.0)
        .build()
        .unwrap();
    let model = create_citation_model(model);

    let message = model
        .invoke(
            &[Message::user_blocks(vec![
                ContentBlock::document(Some("My Document".to_owned()), DOCUMENT),
                ContentBlock::text("What color is the grass, and when does water boil?"),
            ])],
            &[],
        )
        .await
        .unwrap();

    if let MessageContent::Blocks(blocks) = message.content() {
        for block in blocks {
            if let ContentBlock::Text { text, citations } = block {
                println!("{}", text.trim());
                for citation in citations {
                    println!(
                        "    [{}] {:?} ({}..{})",
                        citation.document_title,
                        citation.cited_text,
                        citation.start_char_index,
                        citation.end_char_index
                    );
                }
            }
        }
    } else {
        println!("{}", message.text());
    }
}
