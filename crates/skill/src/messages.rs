//! Fixed utterances and the synthetic prompts sent to the LLM when an intent
//! carries no usable user text.

pub const LAUNCH_MESSAGE: &str = "ネイチャートークアシスタントです。何かお手伝いしましょうか？";
pub const ANYTHING_ELSE_REPROMPT: &str = "他に何かありますか？";
pub const HELP_MESSAGE: &str = "ネイチャートークアシスタントです。「照明を明るくして」や「エアコンをつけて」のようなデバイス操作や、「今日は寒いね」のような自然な会話もできます。";
pub const HELP_REPROMPT: &str = "何かお手伝いしましょうか？";
pub const FAREWELL_MESSAGE: &str = "またお話ししましょう";

pub const FREE_TALK_DEFAULT_PROMPT: &str = "ユーザーが何か話しかけました";
pub const SIMPLE_PHRASE_PROMPT: &str =
    "ユーザーが状態や感情を表現しました（暑い、寒い、疲れた等）。適切に応答してください。";
pub const DEVICE_CONTROL_PROMPT: &str =
    "ユーザーがデバイスの操作を要求しました（つけて、消して等）。文脈から判断して適切に対応してください。";
pub const FALLBACK_PROMPT: &str =
    "ユーザーが話しかけましたが、正確には聞き取れませんでした。自然に会話を続けてください。";
