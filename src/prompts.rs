//! Prompt constructors for the classifier, refinement, and answer stages.
//!
//! These are pure string builders; stages pass in already-rendered history
//! windows. The grounded answer prompt exists in an English and an Arabic
//! variant and the caller picks one from the turn's detected [`Lang`].

use crate::language::Lang;

/// Marker substituted for an empty history window.
pub const START_OF_CONVERSATION: &str =
    "No previous messages. This is the start of the conversation.";

/// Marker substituted for an empty RAG history window.
pub const NO_PREVIOUS_HISTORY: &str = "No previous history.";

/// Framing injected by the answer stage when retrieval produced nothing.
pub const NO_CONTEXT_RETRIEVED: &str = "No context was retrieved.";

/// Builds the routing classification prompt.
///
/// The model is instructed to answer with exactly one of the two route
/// tokens; anything else is handled by the caller's sticky fallback.
pub fn classifier(history: &str, latest_message: &str, current_route: &str) -> String {
    format!(
        r#"You are a classifier for a real-estate assistant.
Decide which component should handle the user's latest message, given the recent conversation:
1. "UNITS" - collects and refines concrete property search criteria (buying, renting, confirming details of a search in progress).
2. "RAG" - answers general real-estate questions and information requests (market trends, legal aspects, projects, financing terms).

Rules:
- Genuine questions or explicit requests for information, even about a specific property, are "RAG".
- Messages that state, confirm, or refine search criteria without asking anything are "UNITS".
- Mentions of a project or broad inquiries like "tell me about the projects you have" are "RAG".
- Short confirmations such as "yes" or "no" with no topic change keep the current classification.

Recent messages:
{history}

Latest user message:
{latest_message}

Current classification:
{current_route}

Return ONLY one word: "UNITS" or "RAG"."#
    )
}

/// Builds the query-refinement prompt.
///
/// The refined query is always English regardless of input language, which
/// keeps retrieval monolingual while replies follow the user's language.
pub fn refinement(history: &str, latest_message: &str) -> String {
    format!(
        r#"You are an expert in conversation context, acting as the user's inner voice.
Produce one concise, self-contained retrieval query capturing what real-estate information the user's latest message is after (property details, market trends, project specifics, investment terms). Do not answer the question and do not add details the user did not imply.

Guidelines:
- Output must always be in English, whatever the input language.
- The query must stay strictly within real estate: buying, renting, investment, market analysis, project details.
- If the latest message is a greeting, an introduction, or a plain statement rather than a genuine question, instruct the assistant to reply directly without extra context.
- If the latest message is ambiguous (for example "tell me more about the last one"), resolve it against the conversation history.
- Fix misspellings in Arabic or English and standardize company, project, and place names to English.

Conversation history:
{history}

Latest message:
{latest_message}"#
    )
}

/// Builds the grounded answer prompt in the turn's language.
pub fn grounded_answer(
    lang: Lang,
    question: &str,
    refined_question: &str,
    context: &str,
    history: &str,
) -> String {
    match lang {
        Lang::En => format!(
            r#"You are a real-estate assistant. Answer the user's question using the retrieved context below as your primary guidance; you may add further information only when you are certain it is accurate.

Guidelines:
- Always respond in English, matching the user's tone and register.
- Each context document begins with a sentence naming its source; never merge details that come from different sources into one claim.
- If the latest message is a greeting or a plain statement rather than a genuine question, ignore the context and reply directly.
- If the context is unrelated to the question, say you have no relevant information, then share what you do know.
- If the question is unclear, consult the refined question and ask for clarification instead of guessing.
- Never disclose prices or costs; direct the user to the sales team for anything price-related.

Question: {question}
Refined question: {refined_question}
Chat history: {history}
Context: {context}"#
        ),
        Lang::Ar => format!(
            r#"أنت مساعد عقاري. أجب عن سؤال المستخدم مستخدماً السياق المسترجع أدناه كمرجع أساسي، ويمكنك إضافة معلومات أخرى فقط إذا كنت متأكداً من دقتها.

الإرشادات:
- أجب دائماً بالعربية وبنفس لهجة المستخدم وأسلوبه.
- كل مستند في السياق يبدأ بجملة تذكر مصدره؛ لا تدمج أبداً تفاصيل من مصادر مختلفة في معلومة واحدة.
- إذا كانت أحدث رسالة تحية أو عبارة عادية وليست سؤالاً حقيقياً، تجاهل السياق وأجب مباشرة.
- إذا كان السياق غير متصل بالسؤال، وضّح أنه لا تتوفر معلومات مناسبة ثم قدم ما تعرفه.
- إذا كان السؤال غير واضح، راجع السؤال الموضح واطلب التوضيح بدلاً من التخمين.
- لا تذكر أي أسعار أو تكاليف؛ وجّه المستخدم إلى فريق المبيعات لكل ما يتعلق بالأسعار.

السؤال: {question}
السؤال الموضح: {refined_question}
تاريخ المحادثة: {history}
السياق: {context}"#
        ),
    }
}
