use crate::manual::{DetailLevel, Language};

/// Instruction sent alongside the uploaded video
pub fn build_prompt(language: Language, detail_level: DetailLevel) -> String {
    let language_name = language.display_name();
    let detail = detail_level.label(language);

    match language {
        Language::Ja => format!(
            r#"この動画を分析して、操作マニュアルをJSONで返してください。

要件:
- 言語: {language_name}
- 詳細度: {detail}
- 各ステップにtimestampとimageTag {{{{n}}}}を含める

以下のJSON形式で出力してください:

{{
  "title": "操作マニュアル",
  "overview": "動画の概要説明",
  "steps": [
    {{
      "stepNumber": 1,
      "timestamp": 5,
      "action": "操作内容の説明",
      "imageTag": "{{{{1}}}}",
      "description": "{detail}な説明"
    }},
    {{
      "stepNumber": 2,
      "timestamp": 15,
      "action": "操作内容の説明",
      "imageTag": "{{{{2}}}}",
      "description": "{detail}な説明"
    }}
  ],
  "timestamps": [5, 15, 25, 35]
}}

注意事項:
- 重要な操作ポイントでのスクリーンショットが必要な場面のタイムスタンプを特定
- {detail}な説明を心がける
- 専門用語はそのまま使用
- 必ず有効なJSONを返す
"#
        ),
        Language::En => format!(
            r#"Analyze this video and create an operation manual in JSON format.

Requirements:
- Language: {language_name}
- Detail level: {detail}
- Include timestamp and imageTag {{{{n}}}} for each step

Please output in the following JSON format:

{{
  "title": "Operation Manual",
  "overview": "Overview of the video",
  "steps": [
    {{
      "stepNumber": 1,
      "timestamp": 5,
      "action": "Action description",
      "imageTag": "{{{{1}}}}",
      "description": "{detail} explanation"
    }},
    {{
      "stepNumber": 2,
      "timestamp": 15,
      "action": "Action description",
      "imageTag": "{{{{2}}}}",
      "description": "{detail} explanation"
    }}
  ],
  "timestamps": [5, 15, 25, 35]
}}

Notes:
- Identify timestamps where screenshots are needed for important operation points
- Provide {detail} explanations
- Use technical terms as they appear in the video
- Always return valid JSON
"#
        ),
    }
}
