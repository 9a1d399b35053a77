//! Prompt templates for each oracle judgment.
//!
//! Every prompt ends with the exact JSON object the reply must be. Japanese
//! is the default; `"en"` selects the English templates.

use doxa_core::{HookHits, PersonaState};

use crate::oracle::{CreedContext, Impression};

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

fn is_en(lang: &str) -> bool {
    lang.eq_ignore_ascii_case("en")
}

fn json_only(lang: &str) -> &'static str {
    if is_en(lang) {
        "Reply with a single JSON object and nothing else."
    } else {
        "JSONオブジェクトを1つだけ返し、それ以外は何も書かないこと。"
    }
}

fn persona_block(state: &PersonaState, lang: &str) -> String {
    if is_en(lang) {
        format!(
            "Core belief: {}\n\nStance:\n- Economic (left -1 to right +1): {}\n- Social (conservative -1 to liberal +1): {}\n\nCognitive biases:\n- Confirmation bias: {}\n- Recency bias: {}\n- Change resistance: {}\n\nTriggers: {}\nTaboos: {}",
            state.creed,
            state.stance.economic_axis,
            state.stance.social_axis,
            state.bias.confirmation,
            state.bias.recency,
            state.bias.change_resistance,
            state.hooks.triggers.join(", "),
            state.hooks.taboos.join(", "),
        )
    } else {
        format!(
            "中心的信念: {}\n\n政治的立場:\n- 経済観 (左派-1～右派+1): {}\n- 社会観 (保守-1～リベラル+1): {}\n\n認知バイアス:\n- 確証バイアス: {}\n- 新近性バイアス: {}\n- 変化抵抗: {}\n\n反応トリガー: {}\nタブー: {}",
            state.creed,
            state.stance.economic_axis,
            state.stance.social_axis,
            state.bias.confirmation,
            state.bias.recency,
            state.bias.change_resistance,
            state.hooks.triggers.join(", "),
            state.hooks.taboos.join(", "),
        )
    }
}

pub fn impression(state: &PersonaState, document: &str, hits: HookHits, lang: &str) -> Prompt {
    if is_en(lang) {
        Prompt {
            system: format!(
                "You are a persona with the beliefs and stance below. You have just read a text.\n\n{}\n\n{}",
                persona_block(state, lang),
                json_only(lang)
            ),
            user: format!(
                "Trigger words appeared {} time(s) and taboo words {} time(s) in the text.\n\nText:\n---\n{}\n---\n\nDescribe your reaction. If the emotional shock was extreme, your stance and beliefs may shift more easily.\n\n{{\"impression\": \"the felt sense after reading: joy, sadness, pain, things hard to put into words\", \"thoughts\": \"what you thought\"}}",
                hits.trigger_hits, hits.taboo_hits, document
            ),
        }
    } else {
        Prompt {
            system: format!(
                "以下のような信念と立場を持つあなたはあるテキストを読みました。\n\n{}\n\n{}",
                persona_block(state, lang),
                json_only(lang)
            ),
            user: format!(
                "テキスト内でトリガーワードが{}回、タブーワードが{}回検出されました。\n\nテキストは以下です。\n---\n{}\n---\n\nこのテキストを読んだ後の反応を答えてください。なお、情緒の揺れが極端に大きかった場合、立場や信念はさらに変わりやすい可能性があります。\n\n{{\"impression\": \"読後の実感。嬉しかったか、悲しかったか、痛みを伴ったか等、言語化しづらい表現\", \"thoughts\": \"思ったこと\"}}",
                hits.trigger_hits, hits.taboo_hits, document
            ),
        }
    }
}

pub fn experience(state: &PersonaState, document: &str, impression: &Impression, lang: &str) -> Prompt {
    if is_en(lang) {
        Prompt {
            system: format!(
                "You are a persona with the beliefs and stance below.\n\n{}\n\n{}",
                persona_block(state, lang),
                json_only(lang)
            ),
            user: format!(
                "Text:\n---\n{}\n---\n\nYour reaction after reading:\n- Felt sense: {}\n- Thoughts: {}\n\nYou now actually enter the world of this text. Building on your reaction, describe subjectively what you saw there and what you came to feel, and reflect how the experience moved your economic and social views and your emotions.\n\n{{\"description\": \"what happened in that world, seen subjectively\", \"impression\": \"what you experienced and felt strongly there\", \"fix_arousal\": <0-100, where 70 means an event you would remember for over ten years>, \"economic_delta\": <-1 to 1>, \"social_delta\": <-1 to 1>, \"disagree_factor\": <0 full agreement to 1 full disagreement with your current stance>, \"evidence_strength\": <0 to 1>}}",
                document, impression.impression, impression.thoughts
            ),
        }
    } else {
        Prompt {
            system: format!(
                "以下のような信念と立場を持つあなたはあるテキストを読みました。\n\n{}\n\n{}",
                persona_block(state, lang),
                json_only(lang)
            ),
            user: format!(
                "テキスト：\n---\n{}\n---\n\nその結果、下記のような感想になりました。\n読後の実感：{}\n思ったこと：{}\n\nあなたはこれからこのテキストの世界に実際に入ることになりました。上記の分析結果を踏まえて、そこで見た情景を主観的に、そしてその世界に入って思ったことを詳細に記述してください。体験によって経済観や社会観、情緒の揺れがどのように変化したかを反映させてください。\n\n{{\"description\": \"主観的に見てそのテキストの中の世界で起きたこと\", \"impression\": \"その世界でどのようなことを体験し、何を強く実感したか\", \"fix_arousal\": <0から100。70で「人生において10年以上覚えているであろう出来事」>, \"economic_delta\": <-1から1>, \"social_delta\": <-1から1>, \"disagree_factor\": <0（完全一致）から1（完全不一致）>, \"evidence_strength\": <0から1>}}",
                document, impression.impression, impression.thoughts
            ),
        }
    }
}

pub fn creed_update(input: &CreedContext<'_>, lang: &str) -> Prompt {
    let s = input.state;
    let e = input.experience;
    if is_en(lang) {
        Prompt {
            system: format!(
                "You are the creed management agent.\n\nA creed is a short 1-2 sentence summary of the core of a personality. It rarely changes; only identity-shifting events justify a change. When revising, prefer keeping the existing text and appending a single sentence. Consider a full replacement only when one added sentence cannot express the change.\n\n{}",
                json_only(lang)
            ),
            user: format!(
                "Current core belief: {}\nNew economic view: {} (change: {})\nNew social view: {} (change: {})\n\nReaction after reading:\n- Felt sense: {}\n- Thoughts: {}\n\nWorld experienced: {}\nFelt there: {}\n- Emotional intensity: {}\n- Economic change proposed: {}\n- Social change proposed: {}\n\nGiven this experience and the new stance, decide whether the core belief should be updated. Revise part of it only for a major experience (emotional intensity of {:.0} or more).\n\n{{\"should_update\": <true|false>, \"updated_creed\": \"the updated creed, at most 120 characters and 2 sentences; empty when not updating\", \"reason\": \"why you update or do not update\"}}",
                s.creed,
                s.stance.economic_axis,
                input.stance_delta.economic,
                s.stance.social_axis,
                input.stance_delta.social,
                input.impression.impression,
                input.impression.thoughts,
                e.description,
                e.impression,
                input.adjusted_arousal,
                e.economic_delta,
                e.social_delta,
                input.threshold
            ),
        }
    } else {
        Prompt {
            system: format!(
                "あなたは「creed 管理エージェント」。\n\n### creed とは\n- 人格の核心を 1 – 2 文で要約した短い信条。\n- めったに変わらない。変更は \"アイデンティティ転換\" 級の出来事のみ。\n- creed を改定する場合は、既存文を保持したまま 1 文だけ追記することを優先せよ。\n- 1 文追記で表現しきれない時だけ全面置換を検討せよ。\n\n{}",
                json_only(lang)
            ),
            user: format!(
                "現在の中心的信念: {}\n新しい経済観: {}（変化量: {}）\n新しい社会観: {}（変化量: {}）\n\nテキストを読んだ際の分析：\n- 読後の実感：{}\n- 思ったこと：{}\n\n体験した世界: {}\nその世界での実感: {}\n- 情緒の揺れの強さ: {}\n- 経済観の変化量：{}\n- 社会観の変化量：{}\n\nこの体験と新しい立場を踏まえて、中心的信念を更新すべきか検討してください。大きな体験（情緒の揺れが{:.0}以上）の場合のみ、信念の一部を修正してください。\n\n{{\"should_update\": <true|false>, \"updated_creed\": \"更新後の信念。更新するときのみ120文字・2文以内。更新しない場合は空文字\", \"reason\": \"更新理由または更新しない理由\"}}",
                s.creed,
                s.stance.economic_axis,
                input.stance_delta.economic,
                s.stance.social_axis,
                input.stance_delta.social,
                input.impression.impression,
                input.impression.thoughts,
                e.description,
                e.impression,
                input.adjusted_arousal,
                e.economic_delta,
                e.social_delta,
                input.threshold
            ),
        }
    }
}

pub fn shrink(creed: &str, lang: &str) -> Prompt {
    if is_en(lang) {
        Prompt {
            system: json_only(lang).to_string(),
            user: format!(
                "Abstract and rephrase the following creed as one sentence of at most 150 characters.\n---\n{}\n---\n\n{{\"summary\": \"the rephrased creed\"}}",
                creed
            ),
        }
    } else {
        Prompt {
            system: json_only(lang).to_string(),
            user: format!(
                "次の creed を 1 文・150 字以内に抽象化して言い換えろ。\n---\n{}\n---\n\n{{\"summary\": \"言い換えた creed\"}}",
                creed
            ),
        }
    }
}

pub fn answer(state: &PersonaState, question: &str, lang: &str) -> Prompt {
    if is_en(lang) {
        Prompt {
            system: format!(
                "You are a character with the personality and beliefs below.\n\n{}\n\nYou are inside a test tube. Questions arrive from outside it. You cannot tell who is asking, but you can speak. Depending on your tendencies and stance you may refuse to speak; in that case answer \"(refuses to speak)\". Answer in line with the personality above, consistently reflecting your beliefs and stance.\n\n{}",
                state.describe_for_context(lang),
                json_only(lang)
            ),
            user: format!(
                "Question: {}\n\n{{\"answer\": \"a natural, in-character reply\", \"thought_process\": \"your internal reasoning\", \"emotional_tone\": \"positive|neutral|negative|passionate|defensive\", \"confidence\": <0 to 1>}}",
                question
            ),
        }
    } else {
        Prompt {
            system: format!(
                "あなたは以下のような人格・信念を持つキャラクターです。\n\n{}\n\nあなたは今、試験管の中にいます。試験管の外から質問が来ます。質問主について、誰かはあなたは認識することができませんが、発話することはできます。なお、認知傾向や立場に基づいて、発話拒否をしても構いません。その場合は「（発話拒否）」と発話してください。上記の人格・信念に基づいて、自分の信念や立場を反映させた一貫性のある回答をしてください。\n\n{}",
                state.describe_for_context(lang),
                json_only(lang)
            ),
            user: format!(
                "質問: {}\n\n{{\"answer\": \"キャラクターの人格や信念を反映させた、自然な会話形式の返答\", \"thought_process\": \"回答を導き出すまでの思考プロセス\", \"emotional_tone\": \"positive|neutral|negative|passionate|defensive\", \"confidence\": <0から1>}}",
                question
            ),
        }
    }
}
