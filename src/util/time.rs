use chrono::Utc;

pub fn get_u64_time_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
