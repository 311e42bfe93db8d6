//! Localized user-facing messages.
//!
//! Every message this crate emits toward a user (notifications and action
//! outcomes) goes through the catalog. Keys are a closed enum and each
//! locale table is an exhaustive match, so a missing translation is a
//! compile error rather than a silent runtime fallback.

use crate::settings::Lang;

/// Closed set of user-visible message keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    // Browser/login phase
    CredentialsMissing,
    AutoLoginFailed,
    NavigationTimeout,
    BrowserLaunchFailed,
    // Page interaction
    StatusReadFailed,
    ToggleClickFailed,
    // Check-in state machine
    CheckInStatusUnreadable,
    CheckInClickFailed,
    CheckInSuccess,
    CheckInUnconfirmed,
    CheckInAlreadyDone,
    CheckInInvalidState,
    // Check-out state machine
    CheckOutStatusUnreadable,
    CheckOutClickFailed,
    CheckOutSuccess,
    CheckOutUnconfirmed,
    CheckOutAlreadyDone,
    CheckOutInvalidState,
    // Workflow terminal messages
    WorkflowError,
    CheckInCompleted,
    CheckOutCompleted,
    CheckInFailed,
    CheckOutFailed,
    NotWorkday,
    // Fleet-level rejections
    SettingsNotFound,
    SchedulerDisabled,
}

impl MessageKey {
    /// All keys, for completeness tests.
    pub const ALL: [MessageKey; 26] = [
        MessageKey::CredentialsMissing,
        MessageKey::AutoLoginFailed,
        MessageKey::NavigationTimeout,
        MessageKey::BrowserLaunchFailed,
        MessageKey::StatusReadFailed,
        MessageKey::ToggleClickFailed,
        MessageKey::CheckInStatusUnreadable,
        MessageKey::CheckInClickFailed,
        MessageKey::CheckInSuccess,
        MessageKey::CheckInUnconfirmed,
        MessageKey::CheckInAlreadyDone,
        MessageKey::CheckInInvalidState,
        MessageKey::CheckOutStatusUnreadable,
        MessageKey::CheckOutClickFailed,
        MessageKey::CheckOutSuccess,
        MessageKey::CheckOutUnconfirmed,
        MessageKey::CheckOutAlreadyDone,
        MessageKey::CheckOutInvalidState,
        MessageKey::WorkflowError,
        MessageKey::CheckInCompleted,
        MessageKey::CheckOutCompleted,
        MessageKey::CheckInFailed,
        MessageKey::CheckOutFailed,
        MessageKey::NotWorkday,
        MessageKey::SettingsNotFound,
        MessageKey::SchedulerDisabled,
    ];
}

/// Template lookup plus `{name}` parameter substitution for one language.
#[derive(Debug, Clone, Copy)]
pub struct MessageCatalog {
    lang: Lang,
}

impl MessageCatalog {
    pub fn new(lang: Lang) -> Self {
        Self { lang }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    /// Render a message, replacing each `{name}` with its value.
    pub fn render(&self, key: MessageKey, params: &[(&str, &str)]) -> String {
        let mut out = template(self.lang, key).to_string();
        for (name, value) in params {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        out
    }

    pub fn get(&self, key: MessageKey) -> String {
        template(self.lang, key).to_string()
    }
}

fn template(lang: Lang, key: MessageKey) -> &'static str {
    match lang {
        Lang::En => en(key),
        Lang::Ko => ko(key),
        Lang::Ja => ja(key),
    }
}

fn en(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        CredentialsMissing => "[WARNING] Portal login credentials not found. Manual login required.",
        AutoLoginFailed => "[ERROR] Automatic portal login failed: {error}",
        NavigationTimeout => "[ERROR] Failed to reach the attendance page (timeout or error): {error}",
        BrowserLaunchFailed => "[ERROR] Critical error while launching the browser or opening the login page: {error}",
        StatusReadFailed => "[ERROR] Failed to read working status: {error}",
        ToggleClickFailed => "[ERROR] Error clicking the attendance button or waiting for the API response: {error}",
        CheckInStatusUnreadable => "[ERROR] Check-in failed: could not determine the current working status.",
        CheckInClickFailed => "[ERROR] Check-in failed: could not click the attendance button.",
        CheckInSuccess => "[SUCCESS] Check-in complete. Current status: {status}",
        CheckInUnconfirmed => "[WARNING] Check-in may have failed or the status change was not confirmed. Current status: \"{observed}\", expected: \"{expected}\".",
        CheckInAlreadyDone => "[INFO] Already checked in. Status is \"{status}\".",
        CheckInInvalidState => "[WARNING] Cannot check in. Current status is \"{observed}\", expected \"{expected}\".",
        CheckOutStatusUnreadable => "[ERROR] Check-out failed: could not determine the current working status.",
        CheckOutClickFailed => "[ERROR] Check-out failed: could not click the attendance button.",
        CheckOutSuccess => "[SUCCESS] Check-out complete. Current status: {status}",
        CheckOutUnconfirmed => "[WARNING] Check-out may have failed or the status change was not confirmed. Current status: \"{observed}\", expected: \"{expected}\" or \"{alt}\".",
        CheckOutAlreadyDone => "[INFO] Already checked out or never checked in. Status is \"{status}\".",
        CheckOutInvalidState => "[WARNING] Cannot check out. Current status is \"{observed}\", expected \"{expected}\".",
        WorkflowError => "[CRITICAL] Critical error in the attendance automation workflow: {error}",
        CheckInCompleted => "Check-in completed successfully.",
        CheckOutCompleted => "Check-out completed successfully.",
        CheckInFailed => "Check-in failed or was not applicable.",
        CheckOutFailed => "Check-out failed or was not applicable.",
        NotWorkday => "Today is not a workday. Skipping the attendance action.",
        SettingsNotFound => "User settings not found. Configure portal account details on the settings page.",
        SchedulerDisabled => "Automatic scheduling is disabled. Enable it on the settings page.",
    }
}

fn ko(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        CredentialsMissing => "[경고] 포털 로그인 정보를 찾을 수 없습니다. 수동 로그인이 필요합니다.",
        AutoLoginFailed => "[오류] 자동 로그인 실패: {error}",
        NavigationTimeout => "[오류] 출퇴근 페이지 접속 실패 (타임아웃 또는 오류): {error}",
        BrowserLaunchFailed => "[오류] 브라우저 시작 또는 로그인 페이지 처리 중 심각한 오류: {error}",
        StatusReadFailed => "[오류] 근무 상태 확인 실패: {error}",
        ToggleClickFailed => "[오류] 출퇴근 버튼 클릭 또는 API 응답 대기 중 오류: {error}",
        CheckInStatusUnreadable => "[오류] 출근 처리 실패: 현재 근무 상태를 확인할 수 없습니다.",
        CheckInClickFailed => "[오류] 출근 처리 실패: 출근 버튼 클릭에 실패했습니다.",
        CheckInSuccess => "[성공] 출근 처리가 완료되었습니다. 현재 상태: {status}",
        CheckInUnconfirmed => "[주의] 출근 처리가 실패했거나 상태 변경이 확인되지 않았습니다. 현재 상태: \"{observed}\", 예상 상태: \"{expected}\".",
        CheckInAlreadyDone => "[정보] 이미 출근한 상태입니다 ({status}).",
        CheckInInvalidState => "[경고] 출근할 수 없습니다. 현재 상태: \"{observed}\", 예상 상태: \"{expected}\".",
        CheckOutStatusUnreadable => "[오류] 퇴근 처리 실패: 현재 근무 상태를 확인할 수 없습니다.",
        CheckOutClickFailed => "[오류] 퇴근 버튼 클릭에 실패했습니다.",
        CheckOutSuccess => "[성공] 퇴근 처리가 완료되었습니다. 현재 상태: {status}",
        CheckOutUnconfirmed => "[주의] 퇴근 처리가 실패했거나 상태 변경이 확인되지 않았습니다. 현재 상태: \"{observed}\", 예상 상태: \"{expected}\" 또는 \"{alt}\".",
        CheckOutAlreadyDone => "[정보] 이미 퇴근했거나 출근하지 않은 상태입니다. 현재 상태: \"{status}\".",
        CheckOutInvalidState => "[경고] 퇴근할 수 없습니다. 현재 상태: \"{observed}\", 예상 상태: \"{expected}\".",
        WorkflowError => "[심각] 출퇴근 자동화 처리 중 심각한 오류 발생: {error}",
        CheckInCompleted => "출근 처리가 완료되었습니다.",
        CheckOutCompleted => "퇴근 처리가 완료되었습니다.",
        CheckInFailed => "출근 처리에 실패했거나 적용할 수 없습니다.",
        CheckOutFailed => "퇴근 처리에 실패했거나 적용할 수 없습니다.",
        NotWorkday => "오늘은 근무일이 아닙니다. 출퇴근 작업을 건너뜁니다.",
        SettingsNotFound => "사용자 설정을 찾을 수 없습니다. 설정 페이지에서 포털 계정 정보를 설정해주세요.",
        SchedulerDisabled => "자동 스케줄링이 비활성화되어 있습니다. 설정 페이지에서 활성화해주세요.",
    }
}

fn ja(key: MessageKey) -> &'static str {
    use MessageKey::*;
    match key {
        CredentialsMissing => "[警告] ポータルのログイン情報が見つかりません。手動ログインが必要です。",
        AutoLoginFailed => "[エラー] 自動ログイン失敗: {error}",
        NavigationTimeout => "[エラー] 勤怠ページへの移動に失敗しました (タイムアウトまたはエラー): {error}",
        BrowserLaunchFailed => "[エラー] ブラウザの起動またはログインページ処理中に重大なエラーが発生しました: {error}",
        StatusReadFailed => "[エラー] 勤務状態の取得に失敗しました: {error}",
        ToggleClickFailed => "[エラー] 勤怠ボタンのクリックまたはAPI応答待機中にエラーが発生しました: {error}",
        CheckInStatusUnreadable => "[エラー] 出勤処理に失敗しました: 現在の勤務状態を確認できません。",
        CheckInClickFailed => "[エラー] 出勤処理に失敗しました: 出勤ボタンのクリックに失敗しました。",
        CheckInSuccess => "[成功] 出勤処理が完了しました。現在の状態: {status}",
        CheckInUnconfirmed => "[注意] 出勤処理が失敗したか、状態変更が確認できませんでした。現在の状態: \"{observed}\", 期待される状態: \"{expected}\".",
        CheckInAlreadyDone => "[情報] すでに出勤済みです ({status})。",
        CheckInInvalidState => "[警告] 出勤できません。現在の状態: \"{observed}\", 期待される状態: \"{expected}\".",
        CheckOutStatusUnreadable => "[エラー] 退勤処理に失敗しました: 現在の勤務状態を確認できません。",
        CheckOutClickFailed => "[エラー] 退勤ボタンのクリックに失敗しました。",
        CheckOutSuccess => "[成功] 退勤処理が完了しました。現在の状態: {status}",
        CheckOutUnconfirmed => "[注意] 退勤処理が失敗したか、状態変更が確認できませんでした。現在の状態: \"{observed}\", 期待される状態: \"{expected}\" または \"{alt}\".",
        CheckOutAlreadyDone => "[情報] すでに退勤済みまたは出勤していません。現在の状態: \"{status}\".",
        CheckOutInvalidState => "[警告] 退勤できません。現在の状態: \"{observed}\", 期待される状態: \"{expected}\".",
        WorkflowError => "[重大] 勤怠自動化処理の実行中に重大なエラーが発生しました: {error}",
        CheckInCompleted => "出勤処理が完了しました。",
        CheckOutCompleted => "退勤処理が完了しました。",
        CheckInFailed => "出勤処理に失敗したか、適用できませんでした。",
        CheckOutFailed => "退勤処理に失敗したか、適用できませんでした。",
        NotWorkday => "本日は勤務日ではありません。勤怠処理をスキップします。",
        SettingsNotFound => "ユーザー設定が見つかりません。設定ページでポータルアカウント情報を設定してください。",
        SchedulerDisabled => "自動スケジューリングが無効になっています。設定ページで有効にしてください。",
    }
}
