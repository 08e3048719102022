//! Message texts. All are sent with Markdown parse mode.

use wird_core::{HijriDate, Prayer};

pub const MORNING_AZKAR: &str = "☀️ *أذكار الصباح*\n\n﴿فَاذْكُرُونِي أَذْكُرْكُمْ﴾";

pub const EVENING_AZKAR: &str = "🌙 *أذكار المساء*\n\n﴿وَاذْكُر رَّبَّكَ﴾";

pub const SURAH_MULK: &str = "🌙 *سورة الملك*\n\n أن النبيَّ صلَّى اللهُ عليهِ وسلَّمَ كان لا ينامُ حتى يقرأَ الم تنزيلُ و تباركَ الذي بيدِه الملكُ ";

pub const FRIDAY_KAHF: &str = "🕌 *جمعة مباركة*\n\n📖 سورة الكهف\n\n💚 الصلاة على النبي ﷺ";

pub const KAHF_FILE_NAME: &str = "سورة_الكهف.pdf";

pub const QIYAM: &str = "🌙 *قيام الليل*\n\nالثلث الأخير من الليل \n\n قيام الليل له فضل عظيم، فهو وسيلة للقرب من الله، ومكفر للذنوب، ومنهاة عن الإثم، كما أنه يقرب العبد من ربه ويجعله من القانتين، بالإضافة إلى أنه وقت لإجابة الدعاء وتفريج الهموم، ويفتح أبواب الخير والبركة 🍃";

pub const WHITE_DAYS_EVE: &str = "⚪ *الأيام البيض*\n\nغدًا صيام الأيام البيض\n يوم 13 و14 و15 ";

pub const PAGES_UNAVAILABLE: &str = "⚠️ صفحات الورد غير متوفرة حالياً";

pub const WELCOME_GROUP: &str = "السلام عليكم ورحمة الله وبركاته 🌙\n\n*وِرْدُ المُسْلِم*\n\n📚 التذكيرات:\n• الورد اليومي (صور)\n• أذكار الصباح والمساء\n• سورة الكهف (الجمعة)\n• سورة البقرة (اختياري)\n• المناسبات الإسلامية\n\n🕌 بارك الله فيكم";

pub const HELP: &str = "ℹ️ *وِرْدُ المُسْلِم*\n\n/start - البدء\n/wird - الورد الآن\n/pages N - عدد الصفحات\n/time HH:MM - وقت الورد\n/tz N - فرق التوقيت\n/settings - الإعدادات\n/toggle baqarah|morning\\_azkar|evening\\_azkar|kahf|mulk|white\\_days on|off\n/city المدينة, الدولة\n\n*المميزات:*\n📖 الورد اليومي (وقت مخصص)\n📗 سورة البقرة (12 صفحة)\n☀️ أذكار الصباح والمساء\n🌙 سورة الملك\n🕋 سورة الكهف (الجمعة)\n⚪ الأيام البيض\n📅 المناسبات الإسلامية\n🤲 أذكار متنوعة\n\n*للمجموعات والقنوات:*\nأضف البوت وسيعمل تلقائياً\n\n🤲 بارك الله فيك";

pub fn welcome_private(first_name: &str) -> String {
    format!(
        "السلام عليكم {first_name} 🌙\n\n*وِرْدُ المُسْلِم*\n\n📚 سأساعدك في:\n• قراءة الورد اليومي\n• التذكير بالأذكار\n• المناسبات الإسلامية\n\nأرسل /help لعرض الأوامر 👇"
    )
}

pub fn daily_wird(start: u32, end: u32) -> String {
    format!(
        "📖 *الورد اليومي*\n\n إِنَّ هَذَا الْقُرْآنَ يَهْدِي لِلَّتِي هِيَ أَقْوَمُ [الإسراء:9]\n\nالصفحات: {start} - {end}"
    )
}

pub fn prayer_name_ar(prayer: Prayer) -> &'static str {
    match prayer {
        Prayer::Fajr => "الفجر",
        Prayer::Dhuhr => "الظهر",
        Prayer::Asr => "العصر",
        Prayer::Maghrib => "المغرب",
        Prayer::Isha => "العشاء",
    }
}

pub fn baqarah_part(prayer: Prayer, start: u32, end: u32) -> String {
    format!(
        "📗 *سورة البقرة*\n\nبعد {}\nصفحات {start}-{end}",
        prayer_name_ar(prayer)
    )
}

pub fn occasion(date: &HijriDate, label: &str) -> String {
    format!(
        "🌙 *مناسبة*\n\n📅 {} {}\n\n{label}",
        date.day, date.month_name
    )
}

pub fn preview(daily_pages: u32, current_page: u32, quran_time: &str) -> String {
    format!(
        "⚙️ *الإعدادات*\n\n📖 عدد الصفحات: {daily_pages}\n📍 الصفحة الحالية: {current_page}\n⏰ وقت الورد: {quran_time}"
    )
}
