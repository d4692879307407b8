//! Language-selected prompt templates for the verdict and mini-lesson LLM
//! calls (`spec.md` §4.6 steps 5/7), ported verbatim from the per-language
//! templates in the original enrichment/check services so the wire JSON
//! shape the model is asked for doesn't drift between languages.

use triage_core::domain::Language;

use crate::verdict::EvidenceItem;

fn evidence_block(evidence: &[EvidenceItem]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}: {} (Source: {})\n", i + 1, item.title, item.snippet, item.url))
        .collect()
}

/// Step 5: restates the claim, enumerates evidence, asks for the verdict
/// JSON shape.
pub fn verdict_prompt(language: Language, claim: &str, evidence: &[EvidenceItem]) -> String {
    let evidence_text = evidence_block(evidence);
    match language {
        Language::Hi => format!(
            r#"आप एक तथ्य-जांच विशेषज्ञ हैं। निम्नलिखित दावे और साक्ष्य का विश्लेषण करें:

दावा: {claim}

साक्ष्य:
{evidence_text}

कृपया निम्नलिखित JSON प्रारूप में उत्तर दें:
{{
    "verdict": "TRUE" | "FALSE" | "MISLEADING" | "UNVERIFIED" | "PARTIALLY TRUE",
    "trust_score": 0-100,
    "reasons": ["कारण 1", "कारण 2"],
    "evidence_list": ["साक्ष्य 1", "साक्ष्य 2"],
    "confidence": 0-100,
    "one_line_tip": "एक पंक्ति का सुझाव"
}}"#
        ),
        Language::Ta => format!(
            r#"நீங்கள் ஒரு உண்மை சரிபார்ப்பு நிபுணர். பின்வரும் கூற்று மற்றும் சான்றுகளை பகுப்பாய்வு செய்யுங்கள்:

கூற்று: {claim}

சான்றுகள்:
{evidence_text}

தயவுசெய்து பின்வரும் JSON வடிவத்தில் பதிலளிக்கவும்:
{{
    "verdict": "TRUE" | "FALSE" | "MISLEADING" | "UNVERIFIED" | "PARTIALLY TRUE",
    "trust_score": 0-100,
    "reasons": ["காரணம் 1", "காரணம் 2"],
    "evidence_list": ["சான்று 1", "சான்று 2"],
    "confidence": 0-100,
    "one_line_tip": "ஒரு வரி உதவி"
}}"#
        ),
        Language::Kn => format!(
            r#"ನೀವು ಸತ್ಯ ಪರಿಶೀಲನಾ ತಜ್ಞ. ಕೆಳಗಿನ ಹೇಳಿಕೆ ಮತ್ತು ಪುರಾವೆಗಳನ್ನು ವಿಶ್ಲೇಷಿಸಿ:

ಹೇಳಿಕೆ: {claim}

ಪುರಾವೆಗಳು:
{evidence_text}

ದಯವಿಟ್ಟು ಕೆಳಗಿನ JSON ಸ್ವರೂಪದಲ್ಲಿ ಉತ್ತರಿಸಿ:
{{
    "verdict": "TRUE" | "FALSE" | "MISLEADING" | "UNVERIFIED" | "PARTIALLY TRUE",
    "trust_score": 0-100,
    "reasons": ["ಕಾರಣ 1", "ಕಾರಣ 2"],
    "evidence_list": ["ಪುರಾವೆ 1", "ಪುರಾವೆ 2"],
    "confidence": 0-100,
    "one_line_tip": "ಒಂದು ಸಾಲಿನ ಸಲಹೆ"
}}"#
        ),
        Language::En => format!(
            r#"You are a fact-checking expert. Analyze the following claim and evidence:

Claim: {claim}

Evidence:
{evidence_text}

Please respond in the following JSON format:
{{
    "verdict": "TRUE" | "FALSE" | "MISLEADING" | "UNVERIFIED" | "PARTIALLY TRUE",
    "trust_score": 0-100,
    "reasons": ["reason 1", "reason 2"],
    "evidence_list": ["evidence 1", "evidence 2"],
    "confidence": 0-100,
    "one_line_tip": "One line tip"
}}"#
        ),
    }
}

/// Step 7: asks for `{mini_lesson, tips, quiz}` given the claim and its verdict.
pub fn lesson_prompt(language: Language, claim: &str, verdict_wire: &str, evidence: &[EvidenceItem]) -> String {
    let evidence_text: String = evidence
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, item)| format!("{}. {}: {}\n", i + 1, item.title, item.snippet))
        .collect();
    match language {
        Language::Hi => format!(
            r#"आप एक शिक्षक हैं। निम्नलिखित दावे के बारे में एक संक्षिप्त पाठ (20-45 सेकंड पढ़ने योग्य) बनाएं:

दावा: {claim}
निर्णय: {verdict_wire}

साक्ष्य:
{evidence_text}

कृपया निम्नलिखित JSON प्रारूप में उत्तर दें:
{{
    "mini_lesson": "संक्षिप्त पाठ (1 पैराग्राफ)",
    "tips": ["सुझाव 1", "सुझाव 2"],
    "quiz": {{
        "question": "प्रश्न",
        "options": ["A", "B", "C"],
        "answer": "A"
    }}
}}"#
        ),
        Language::Ta => format!(
            r#"நீங்கள் ஒரு ஆசிரியர். பின்வரும் கூற்று பற்றி ஒரு சுருக்கமான பாடம் (20-45 வினாடிகள் படிக்கக்கூடியது) உருவாக்குங்கள்:

கூற்று: {claim}
தீர்ப்பு: {verdict_wire}

சான்றுகள்:
{evidence_text}

தயவுசெய்து பின்வரும் JSON வடிவத்தில் பதிலளிக்கவும்:
{{
    "mini_lesson": "சுருக்கமான பாடம் (1 பத்தி)",
    "tips": ["உதவி 1", "உதவி 2"],
    "quiz": {{
        "question": "கேள்வி",
        "options": ["A", "B", "C"],
        "answer": "A"
    }}
}}"#
        ),
        Language::Kn => format!(
            r#"ನೀವು ಶಿಕ್ಷಕ. ಕೆಳಗಿನ ಹೇಳಿಕೆಯ ಬಗ್ಗೆ ಸಂಕ್ಷಿಪ್ತ ಪಾಠ (20-45 ಸೆಕೆಂಡುಗಳು ಓದಲು) ರಚಿಸಿ:

ಹೇಳಿಕೆ: {claim}
ನಿರ್ಣಯ: {verdict_wire}

ಪುರಾವೆಗಳು:
{evidence_text}

ದಯವಿಟ್ಟು ಕೆಳಗಿನ JSON ಸ್ವರೂಪದಲ್ಲಿ ಉತ್ತರಿಸಿ:
{{
    "mini_lesson": "ಸಂಕ್ಷಿಪ್ತ ಪಾಠ (1 ಪ್ಯಾರಾಗ್ರಾಫ್)",
    "tips": ["ಸಲಹೆ 1", "ಸಲಹೆ 2"],
    "quiz": {{
        "question": "ಪ್ರಶ್ನೆ",
        "options": ["A", "B", "C"],
        "answer": "A"
    }}
}}"#
        ),
        Language::En => format!(
            r#"You are a teacher. Create a brief lesson (20-45 seconds readable) about the following claim:

Claim: {claim}
Verdict: {verdict_wire}

Evidence:
{evidence_text}

Please respond in the following JSON format:
{{
    "mini_lesson": "Brief lesson (1 paragraph)",
    "tips": ["tip 1", "tip 2"],
    "quiz": {{
        "question": "Question",
        "options": ["A", "B", "C"],
        "answer": "A"
    }}
}}"#
        ),
    }
}

/// The classifier capability's raw scoring prompt (C5), asking for a bare
/// numeric answer rather than JSON.
pub fn classifier_prompt(text: &str, language: Language) -> String {
    format!(
        r#"Classify the following text as scam (1.0) or not scam (0.0).
Respond with only a number between 0.0 and 1.0.

Text: {text}
Language: {language}

Consider these factors:
- Urgency and pressure tactics
- Promises of easy money or prizes
- Requests for personal information or payment
- Suspicious URLs or contact methods
- Grammatical errors or unprofessional language

Score:"#,
        text = text,
        language = language.as_str(),
    )
}
