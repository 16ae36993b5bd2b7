/// Fixed coaching prompt; the user's text is embedded verbatim
pub fn transformation_prompt(text: &str) -> String {
    format!(
        r#"
You're helping someone express their thoughts more clearly and naturally. Transform their message to sound like the thoughtful, well-spoken version of themselves.

Original: "{text}"

Make it:
- Clear and natural (not stiff or corporate)
- Sound like how people actually talk when they're being thoughtful
- Fix grammar and awkward phrasing
- Better flow and word choice
- Genuine but more polished

Guidelines:
- Keep it conversational and human
- Use everyday language that flows well
- Make it sound confident but not pretentious
- Fix mistakes without losing personality
- Think "smart friend giving advice" not "business presentation"

Then identify 3 key phrases from your transformation that made it better.

Respond in JSON:
{{
  "transformedText": "Your natural version here",
  "keyPhrases": [
    {{
      "phrase": "specific improved phrase",
      "explanation": "Brief benefit (6 words max)"
    }},
    {{
      "phrase": "another better phrase",
      "explanation": "Why it's better (6 words max)"
    }},
    {{
      "phrase": "third enhanced phrase",
      "explanation": "What it improves (6 words max)"
    }}
  ]
}}

Example transformation:
Original: "VibeUp is super application that help you keep learning new natural and professional tone and style!"
Transformed: "VibeUp is an innovative app that helps you develop natural, professional communication skills through continuous practice and AI-powered guidance."
Key phrases:
- "innovative app" - More natural than "super application"
- "helps you develop" - Clearer, more supportive tone
- "continuous practice" - Better than "keep learning"

Keep it natural and conversational!
"#,
        text = text
    )
}
