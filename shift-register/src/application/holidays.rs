use crate::domain::calendar_logic::HolidayLookup;
use crate::domain::models::HolidayData;

/// 祝日データ (日付 -> 祝日名)。空なら「祝日なし」として動く
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    holidays: HolidayData,
}

impl HolidayCalendar {
    pub fn new(holidays: HolidayData) -> Self {
        Self { holidays }
    }

    pub fn holiday_name(&self, date: &str) -> Option<&str> {
        self.holidays.get(date).map(String::as_str)
    }

    pub fn data(&self) -> &HolidayData {
        &self.holidays
    }

    pub fn is_empty(&self) -> bool {
        self.holidays.is_empty()
    }
}

impl HolidayLookup for HolidayCalendar {
    fn is_holiday(&self, date: &str) -> bool {
        self.holidays.contains_key(date)
    }
}
