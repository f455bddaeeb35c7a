use crate::callback::quiz_answer_data;

/// Inline keyboard rows sent with a message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

impl InlineKeyboard {
    pub fn rows(rows: Vec<Vec<InlineButton>>) -> Self {
        Self { rows }
    }

    /// One full-width button per quiz option, payload carrying the option
    /// index.
    pub fn quiz_options(options: &[String]) -> Self {
        let rows = options
            .iter()
            .enumerate()
            .map(|(idx, opt)| vec![InlineButton::new(opt.clone(), quiz_answer_data(idx))])
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_keyboard_has_one_row_per_option() {
        let options = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let kb = InlineKeyboard::quiz_options(&options);
        assert_eq!(kb.rows.len(), 3);
        assert_eq!(kb.rows[2][0].label, "c");
        assert_eq!(kb.rows[2][0].callback_data, "captcha_answer_2");
    }
}
