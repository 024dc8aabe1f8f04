//! リストフィルタ機能
//!
//! 変更ファイル一覧や PR ディスカッションをキーワードで絞り込む。
//! `matched_indices` は元リストへのインデックスを保持する。

/// リストフィルタの状態
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// フィルタ文字列
    pub query: String,
    /// 元リストへのインデックス（マッチした項目のみ）
    pub matched_indices: Vec<usize>,
    /// matched_indices 内の選択位置（0件時は None）
    pub selected: Option<usize>,
}

impl ListFilter {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.trim().to_string(),
            ..Default::default()
        }
    }

    /// クロージャベースの汎用マッチングでフィルタを適用する。
    ///
    /// `matches` クロージャは各アイテムとクエリ（小文字化済み）を受け取り、
    /// マッチするかどうかを返す。
    pub fn apply<T>(&mut self, items: &[T], matches: impl Fn(&T, &str) -> bool) {
        let query_lower = self.query.to_lowercase();
        self.matched_indices = if query_lower.is_empty() {
            (0..items.len()).collect()
        } else {
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| matches(item, &query_lower))
                .map(|(i, _)| i)
                .collect()
        };
    }

    /// Matched items in original order.
    pub fn matched<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        self.matched_indices
            .iter()
            .filter_map(|&i| items.get(i))
            .collect()
    }

    /// matched_indices 再計算後に selected を安全に同期する。
    ///
    /// 元リストのインデックスを返す。
    pub fn sync_selection(&mut self) -> Option<usize> {
        self.selected = if self.matched_indices.is_empty() {
            None
        } else {
            Some(
                self.selected
                    .unwrap_or(0)
                    .min(self.matched_indices.len() - 1),
            )
        };
        self.selected.map(|s| self.matched_indices[s])
    }

    /// フィルタ結果内で下に移動し、元リストのインデックスを返す
    pub fn navigate_down(&mut self) -> Option<usize> {
        if let Some(sel) = self.selected {
            if sel + 1 < self.matched_indices.len() {
                self.selected = Some(sel + 1);
            }
        }
        self.selected.map(|s| self.matched_indices[s])
    }
}

/// Case-insensitive substring match on any of `fields`. `query` must already be lowercase.
pub fn matches_any(fields: &[&str], query: &str) -> bool {
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}
