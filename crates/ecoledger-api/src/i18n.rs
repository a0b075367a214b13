//! Page translations

use ecoledger_config::Language;
use std::collections::HashMap;

/// UI strings for one language
#[derive(Debug)]
pub struct Translations {
    // Home
    pub title_line1: &'static str,
    pub title_line2: &'static str,
    pub btn_merchant: &'static str,
    pub btn_dashboard: &'static str,
    pub btn_admin: &'static str,

    // Common
    pub back: &'static str,
    pub confirm: &'static str,
    pub remove: &'static str,

    // Merchant
    pub new_entry: &'static str,
    pub amount_label: &'static str,
    pub note_label: &'static str,
    pub note_placeholder: &'static str,
    pub record_btn: &'static str,
    session_stats: &'static str,
    pub syncing: &'static str,

    // Admin
    pub data_mgmt: &'static str,
    pub theme: &'static str,
    pub hex_code: &'static str,
    pub records_title: &'static str,
    pub empty: &'static str,

    // Dashboard
    pub trends: &'static str,
    pub revenue: &'static str,
    pub transactions: &'static str,
    pub impact: &'static str,
    pub co2_saved: &'static str,
    pub velocity: &'static str,
    pub recent: &'static str,
    pub no_data: &'static str,
    pub live: &'static str,

    // Connection status
    pub status_loading: &'static str,
    pub status_synced: &'static str,
    pub status_error: &'static str,
    pub status_idle: &'static str,
    pub recorded: &'static str,
    pub pending: &'static str,
}

impl Translations {
    /// "Session: N entries"
    pub fn session_stats(&self, count: usize) -> String {
        self.session_stats.replace("{count}", &count.to_string())
    }
}

pub static EN: Translations = Translations {
    title_line1: "REIMAGINE",
    title_line2: "LIFECYCLE",
    btn_merchant: "Merchant Entry",
    btn_dashboard: "Visual Analytics",
    btn_admin: "Data Control",
    back: "Back",
    confirm: "CONFIRM",
    remove: "Remove",
    new_entry: "New Entry",
    amount_label: "Amount (CNY)",
    note_label: "Note",
    note_placeholder: "Items, Source, etc...",
    record_btn: "Record Transaction",
    session_stats: "Session: {count} entries",
    syncing: "Syncing...",
    data_mgmt: "Data Management",
    theme: "Theme",
    hex_code: "HEX Code",
    records_title: "Global Records",
    empty: "Empty",
    trends: "Trends",
    revenue: "Revenue",
    transactions: "Transactions",
    impact: "Impact",
    co2_saved: "CO2 Saved",
    velocity: "Velocity",
    recent: "Global Recent",
    no_data: "No data",
    live: "Real-time",
    status_loading: "Connecting...",
    status_synced: "Connected",
    status_error: "Connection failed",
    status_idle: "Not connected",
    recorded: "Recorded",
    pending: "Sent, waiting for confirmation",
};

pub static ZH: Translations = Translations {
    title_line1: "重塑",
    title_line2: "生命周期",
    btn_merchant: "商户录入",
    btn_dashboard: "趋势洞察",
    btn_admin: "数据管理",
    back: "返回",
    confirm: "确认",
    remove: "删除",
    new_entry: "新增录入",
    amount_label: "金额 (元)",
    note_label: "备注",
    note_placeholder: "物品名称、来源等...",
    record_btn: "确认记账",
    session_stats: "本次会话: {count} 笔",
    syncing: "同步中...",
    data_mgmt: "数据管理",
    theme: "主题配色",
    hex_code: "HEX 代码",
    records_title: "全网记录",
    empty: "暂无数据",
    trends: "趋势看板",
    revenue: "总营收",
    transactions: "交易笔数",
    impact: "环保贡献",
    co2_saved: "碳减排",
    velocity: "增长速率",
    recent: "全网实时交易",
    no_data: "暂无数据",
    live: "云端实时",
    status_loading: "连接中...",
    status_synced: "已连接",
    status_error: "连接失败",
    status_idle: "未连接",
    recorded: "已记账",
    pending: "已提交，等待确认",
};

pub fn translations(lang: Language) -> &'static Translations {
    match lang {
        Language::En => &EN,
        Language::Zh => &ZH,
    }
}

/// The other language and the label of the link switching to it
pub fn switch_target(current: Language) -> (Language, &'static str) {
    match current {
        Language::En => (Language::Zh, "中文"),
        Language::Zh => (Language::En, "English"),
    }
}

/// Language from `?lang=`, falling back to `default`
pub fn request_language(params: &HashMap<String, String>, default: Language) -> Language {
    params
        .get("lang")
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
