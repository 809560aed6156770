pub mod app_setting;
pub mod counter;
pub mod invite_code;
pub mod quota_schedule;
pub mod spin_record;
pub mod team_account;
pub mod user;

pub use app_setting::Entity as AppSetting;
pub use counter::Entity as Counter;
pub use invite_code::Entity as InviteCode;
pub use quota_schedule::Entity as QuotaSchedule;
pub use spin_record::Entity as SpinRecord;
pub use team_account::Entity as TeamAccount;
pub use user::Entity as User;
