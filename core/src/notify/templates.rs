//! Localized message templates
//!
//! Templates use `$name` / `${name}` placeholders; `$$` is a literal dollar.
//! Unknown placeholders are left in the text untouched.
//!
//! Builtin `en` and `ru` texts ship with the engine. A TOML override file can
//! replace or add texts:
//!
//! ```toml
//! [quest_new_task]
//! en = "New task #$task_number: $task_question"
//! de = "Neue Aufgabe #$task_number: $task_question"
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::EngineError;

/// Resolves a template by name and preferred locale.
pub trait TemplateResolver: Send + Sync {
    fn resolve(&self, name: &str, locale: &str) -> Option<&str>;
}

const BUILTIN: &[(&str, &str, &str)] = &[
    ("hello", "en", "Hi, $name! I run team quests.\nSend /help to learn how to take part."),
    ("hello", "ru", "Привет, $name! Я бот для командных квестов.\nОтправь /help, чтобы узнать, как участвовать."),
    ("help", "en", "Commands:\n/start - sign up\n/help - this help\n/nickname NAME - change nickname\n/register ID - join a quest\n/unregister - leave the quest\n/aboutquest - current quest\n/aboutteam - your team\n/aboutme - about you\n/answer TEXT - answer the current task\n/hint - ask for a hint (costs points)\n/deleteme - forget me"),
    ("help", "ru", "Команды:\n/start - регистрация\n/help - справка\n/nickname НИКНЕЙМ - смена никнейма\n/register ИДЕНТИФИКАТОР - участвовать в квесте\n/unregister - покинуть квест\n/aboutquest - текущий квест\n/aboutteam - твоя команда\n/aboutme - о тебе\n/answer ОТВЕТ - ответить на задание\n/hint - подсказка (штраф)\n/deleteme - удалить меня"),
    ("change_nickname_success", "en", "Nickname changed to $name."),
    ("change_nickname_success", "ru", "Никнейм изменен на $name."),
    ("change_nickname_fail", "en", "Nickname not changed. Use 3 to 25 letters, digits or underscores."),
    ("change_nickname_fail", "ru", "Никнейм не изменен. Допустимо от 3 до 25 букв, цифр или символов подчеркивания."),
    ("quest_scheduled", "en", "New quest available!\n\n$quest_name\n$quest_description\n\nStarts: $date\nDuration: $duration\n\nTeams:\n$teams\n\nTo take part send:\n/register $event_id"),
    ("quest_scheduled", "ru", "Доступен новый квест!\n\n$quest_name\n$quest_description\n\nНачало: $date\nДлительность: $duration\n\nКоманды:\n$teams\n\nДля участия отправь:\n/register $event_id"),
    ("quest_running", "en", "Quest $quest_name has started. Registration is closed."),
    ("quest_running", "ru", "Квест $quest_name начался. Регистрация закрыта."),
    ("quest_finished", "en", "Quest $quest_name is finished!\n\nResults:\n$leaderboard"),
    ("quest_finished", "ru", "Квест $quest_name завершен!\n\nРезультаты:\n$leaderboard"),
    ("register_qevent_success", "en", "You joined quest #$event_id in team $team_name."),
    ("register_qevent_success", "ru", "Ты зарегистрирован на квест #$event_id в команде $team_name."),
    ("register_qevent_fail", "en", "Registration failed. Check the quest identifier, or leave your current quest first."),
    ("register_qevent_fail", "ru", "Ошибка регистрации. Проверь идентификатор квеста или сначала покинь текущий квест."),
    ("unregister_success", "en", "You left the quest."),
    ("unregister_success", "ru", "Ты покинул квест."),
    ("unregister_fail", "en", "You are not registered for a quest."),
    ("unregister_fail", "ru", "Ты не зарегистрирован на квест."),
    ("give_answer_fail", "en", "You are not playing a quest, so there is nothing to answer."),
    ("give_answer_fail", "ru", "Ты не участвуешь в квесте, чтобы прислать ответ."),
    ("give_answer_wrong_format", "en", "Answer rejected: use 1 to 25 letters, digits or underscores."),
    ("give_answer_wrong_format", "ru", "Ответ не принят: допустимо от 1 до 25 букв, цифр или символов подчеркивания."),
    ("get_hint_fail", "en", "You are not playing a quest, so there is no hint to give."),
    ("get_hint_fail", "ru", "Ты не участвуешь в квесте, чтобы запросить подсказку."),
    ("not_allowed", "en", "Your team has no active task right now."),
    ("not_allowed", "ru", "У твоей команды сейчас нет активного задания."),
    ("not_playing", "en", "You are not playing a quest."),
    ("not_playing", "ru", "Ты не участвуешь в квесте."),
    ("unknown_participant", "en", "I don't know you yet. Send /start first."),
    ("unknown_participant", "ru", "Я тебя пока не знаю. Сначала отправь /start."),
    ("deleteme_success", "en", "Your data has been deleted. Bye!"),
    ("deleteme_success", "ru", "Твои данные удалены. Пока!"),
    ("team_member_joined", "en", "$username joined the team."),
    ("team_member_joined", "ru", "$username присоединился к команде."),
    ("quest_started_info", "en", "The quest begins! Team $team_name.\n$team_description\nTeam chat: $team_communication"),
    ("quest_started_info", "ru", "Квест начинается! Команда $team_name.\n$team_description\nКомандный чат: $team_communication"),
    ("quest_new_task", "en", "New task #$task_number:\n$task_question"),
    ("quest_new_task", "ru", "Новое задание #$task_number:\n$task_question"),
    ("quest_no_tasks_left", "en", "You have completed all tasks!"),
    ("quest_no_tasks_left", "ru", "Вы выполнили все задания!"),
    ("quest_wrong_answer", "en", "$username sent a wrong answer: $answer"),
    ("quest_wrong_answer", "ru", "$username прислал неверный ответ: $answer"),
    ("quest_correct_answer", "en", "$username sent the correct answer: $answer"),
    ("quest_correct_answer", "ru", "$username прислал правильный ответ: $answer"),
    ("get_hint_success", "en", "$username asked for a hint ($hints_left left):\n$task_hint"),
    ("get_hint_success", "ru", "$username запросил подсказку (осталось $hints_left):\n$task_hint"),
    ("get_hint_empty", "en", "$username asked for a hint, but there are no hints left."),
    ("get_hint_empty", "ru", "$username запросил подсказку, но подсказки закончились."),
    ("quest_stopped", "en", "The quest is over for your team. Thanks for playing!"),
    ("quest_stopped", "ru", "Квест для вашей команды окончен. Спасибо за игру!"),
    ("quest_team_score", "en", "Team $team_name completed $tasks_done of $task_count tasks and scored $score points."),
    ("quest_team_score", "ru", "Команда $team_name выполнила $tasks_done из $task_count заданий и набрала $score очков."),
    ("about_me", "en", "Nickname: $name\nState: $state\nTeam: $team_name"),
    ("about_me", "ru", "Никнейм: $name\nСостояние: $state\nКоманда: $team_name"),
    ("about_team", "en", "Team $team_name\n$team_description\nTeam chat: $team_communication\nTask: $task_number of $task_count"),
    ("about_team", "ru", "Команда $team_name\n$team_description\nКомандный чат: $team_communication\nЗадание: $task_number из $task_count"),
    ("about_quest", "en", "$quest_name ($state)\n$quest_description\nStarts: $date\nDuration: $duration"),
    ("about_quest", "ru", "$quest_name ($state)\n$quest_description\nНачало: $date\nДлительность: $duration"),
];

/// Template texts keyed by name, then locale.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, HashMap<String, String>>,
    default_locale: String,
}

impl TemplateStore {
    pub fn empty(default_locale: impl Into<String>) -> Self {
        Self {
            templates: HashMap::new(),
            default_locale: default_locale.into(),
        }
    }

    /// Store preloaded with the builtin `en` and `ru` texts.
    pub fn builtin(default_locale: impl Into<String>) -> Self {
        let mut store = Self::empty(default_locale);
        for (name, locale, text) in BUILTIN {
            store.insert(name, locale, text);
        }
        store
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn insert(&mut self, name: &str, locale: &str, text: &str) {
        self.templates
            .entry(name.to_string())
            .or_default()
            .insert(locale.to_string(), text.to_string());
    }

    /// Merge overrides from a TOML file. Returns the number of texts loaded.
    pub fn merge_file(&mut self, path: &Path) -> Result<usize, EngineError> {
        let storage_err = |message: String| EngineError::Storage {
            path: path.to_path_buf(),
            message,
        };

        let contents = fs::read_to_string(path).map_err(|e| storage_err(e.to_string()))?;
        let overrides: HashMap<String, HashMap<String, String>> =
            toml::from_str(&contents).map_err(|e| storage_err(e.to_string()))?;

        let mut count = 0;
        for (name, texts) in overrides {
            for (locale, text) in texts {
                self.insert(&name, &locale, &text);
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }
}

impl TemplateResolver for TemplateStore {
    fn resolve(&self, name: &str, locale: &str) -> Option<&str> {
        let texts = self.templates.get(name)?;
        texts
            .get(locale)
            .or_else(|| texts.get(&self.default_locale))
            .map(String::as_str)
    }
}

/// Substitute `$name` / `${name}` placeholders.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let lookup = |key: &str| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str());

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some('{') => {
                chars.next();
                let mut key = String::new();
                let mut closed = false;
                for k in chars.by_ref() {
                    if k == '}' {
                        closed = true;
                        break;
                    }
                    key.push(k);
                }
                match lookup(&key) {
                    Some(value) if closed => out.push_str(value),
                    _ => {
                        out.push_str("${");
                        out.push_str(&key);
                        if closed {
                            out.push('}');
                        }
                    }
                }
            }
            _ => {
                let mut key = String::new();
                while let Some(k) = chars.next_if(|k| k.is_ascii_alphanumeric() || *k == '_') {
                    key.push(k);
                }
                match lookup(&key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('$');
                        out.push_str(&key);
                    }
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let vars = [("name", "bob".to_string()), ("name_full", "Bob B".to_string())];
        assert_eq!(render("Hi, $name!", &vars), "Hi, bob!");
        assert_eq!(render("Hi, $name_full", &vars), "Hi, Bob B");
        assert_eq!(render("${name}s turn", &vars), "bobs turn");
        assert_eq!(render("cost: $$5", &vars), "cost: $5");
        assert_eq!(render("$missing stays", &vars), "$missing stays");
        assert_eq!(render("${open", &vars), "${open");
        assert_eq!(render("trailing $", &vars), "trailing $");
    }

    #[test]
    fn test_builtin_locales_are_complete() {
        let store = TemplateStore::builtin("en");
        for name in store.names() {
            assert!(store.templates[name].contains_key("en"), "{name} missing en");
            assert!(store.templates[name].contains_key("ru"), "{name} missing ru");
        }
    }

    #[test]
    fn test_resolve_falls_back_to_default_locale() {
        let store = TemplateStore::builtin("en");
        let en = store.resolve("quest_no_tasks_left", "en").unwrap();
        assert_eq!(store.resolve("quest_no_tasks_left", "fr"), Some(en));
        assert_ne!(store.resolve("quest_no_tasks_left", "ru"), Some(en));
        assert!(store.resolve("no_such_template", "en").is_none());
    }

    #[test]
    fn test_merge_file_overrides_and_adds() {
        let path = std::env::temp_dir().join(format!("questbot-templates-{}.toml", std::process::id()));
        fs::write(
            &path,
            r#"
[quest_no_tasks_left]
en = "All done!"
de = "Alles erledigt!"

[custom]
en = "custom $x"
"#,
        )
        .unwrap();

        let mut store = TemplateStore::builtin("en");
        assert_eq!(store.merge_file(&path).unwrap(), 3);
        assert_eq!(store.resolve("quest_no_tasks_left", "en"), Some("All done!"));
        assert_eq!(store.resolve("quest_no_tasks_left", "de"), Some("Alles erledigt!"));
        assert_eq!(store.resolve("custom", "ru"), Some("custom $x"));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_merge_missing_file_is_storage_error() {
        let mut store = TemplateStore::builtin("en");
        let err = store.merge_file(Path::new("/nonexistent/templates.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Storage { .. }));
    }
}
