//! Reference-data seeding
//!
//! The geo dictionary (18 districts, major areas, MTR stations and the three
//! regions) is seeded with `INSERT OR IGNORE`, so re-running on an existing
//! database never duplicates or overwrites rows.

use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// (chinese_name, english_name, category)
pub const GEO_LOCATIONS: &[(&str, &str, &str)] = &[
    ("中西區", "Central and Western District", "district"),
    ("灣仔", "Wan Chai", "area"),
    ("東區", "Eastern District", "district"),
    ("南區", "Southern District", "district"),
    ("深水埗", "Sham Shui Po", "area"),
    ("油尖旺", "Yau Tsim Mong District", "district"),
    ("九龍城", "Kowloon City District", "district"),
    ("黃大仙", "Wong Tai Sin District", "district"),
    ("觀塘", "Kwun Tong District", "district"),
    ("荃灣", "Tsuen Wan District", "district"),
    ("屯門", "Tuen Mun District", "district"),
    ("元朗", "Yuen Long District", "district"),
    ("北區", "North District", "district"),
    ("大埔", "Tai Po District", "district"),
    ("沙田", "Sha Tin", "area"),
    ("西貢", "Sai Kung District", "district"),
    ("離島", "Islands District", "district"),
    ("中環", "Central", "area"),
    ("金鐘", "Admiralty", "area"),
    ("銅鑼灣", "Causeway Bay", "area"),
    ("天后", "Tin Hau", "area"),
    ("炮台山", "Fortress Hill", "area"),
    ("北角", "North Point", "area"),
    ("鰂魚涌", "Quarry Bay", "area"),
    ("太古", "Tai Koo", "area"),
    ("西營盤", "Sai Ying Pun", "area"),
    ("上環", "Sheung Wan", "area"),
    ("堅尼地城", "Kennedy Town", "area"),
    ("薄扶林", "Pok Fu Lam", "area"),
    ("香港仔", "Aberdeen", "area"),
    ("鴨脷洲", "Ap Lei Chau", "area"),
    ("赤柱", "Stanley", "area"),
    ("尖沙咀", "Tsim Sha Tsui", "area"),
    ("佐敦", "Jordan", "area"),
    ("油麻地", "Yau Ma Tei", "area"),
    ("旺角", "Mong Kok", "area"),
    ("太子", "Prince Edward", "area"),
    ("長沙灣", "Cheung Sha Wan", "area"),
    ("荔枝角", "Lai Chi Kok", "area"),
    ("美孚", "Mei Foo", "area"),
    ("九龍塘", "Kowloon Tong", "area"),
    ("何文田", "Ho Man Tin", "area"),
    ("紅磡", "Hung Hom", "area"),
    ("土瓜灣", "To Kwa Wan", "area"),
    ("馬頭角", "Ma Tau Kok", "area"),
    ("大圍", "Tai Wai", "area"),
    ("火炭", "Fo Tan", "area"),
    ("馬鞍山", "Ma On Shan", "area"),
    ("粉嶺", "Fanling", "area"),
    ("上水", "Sheung Shui", "area"),
    ("天水圍", "Tin Shui Wai", "area"),
    ("葵涌", "Kwai Chung", "area"),
    ("青衣", "Tsing Yi", "area"),
    ("將軍澳", "Tseung Kwan O", "area"),
    ("會展站", "Exhibition Centre Station", "station"),
    ("西灣河站", "Sai Wan Ho Station", "station"),
    ("筲箕灣站", "Shau Kei Wan Station", "station"),
    ("杏花邨站", "Heng Fa Chuen Station", "station"),
    ("柴灣站", "Chai Wan Station", "station"),
    ("香港大學站", "HKU Station", "station"),
    ("海怡半島站", "South Horizons Station", "station"),
    ("利東站", "Lei Tung Station", "station"),
    ("黃竹坑站", "Wong Chuk Hang Station", "station"),
    ("海洋公園站", "Ocean Park Station", "station"),
    ("大窩口站", "Tai Wo Hau Station", "station"),
    ("葵興站", "Kwai Hing Station", "station"),
    ("葵芳站", "Kwai Fong Station", "station"),
    ("荔景站", "Lai King Station", "station"),
    ("欣澳站", "Sunny Bay Station", "station"),
    ("東涌站", "Tung Chung Station", "station"),
    ("機場站", "Airport Station", "station"),
    ("鑽石山站", "Diamond Hill Station", "station"),
    ("彩虹站", "Choi Hung Station", "station"),
    ("九龍灣站", "Kowloon Bay Station", "station"),
    ("牛頭角站", "Ngau Tau Kok Station", "station"),
    ("藍田站", "Lam Tin Station", "station"),
    ("油塘站", "Yau Tong Station", "station"),
    ("調景嶺站", "Tiu Keng Leng Station", "station"),
    ("坑口站", "Hang Hau Station", "station"),
    ("寶琳站", "Po Lam Station", "station"),
    ("將軍澳站", "Tseung Kwan O Station", "station"),
    ("康城站", "LOHAS Park Station", "station"),
    ("何文田站", "Ho Man Tin Station", "station"),
    ("土瓜灣站", "To Kwa Wan Station", "station"),
    ("天水圍站", "Tin Shui Wai Station", "station"),
    ("宋皇臺站", "Sung Wong Toi Station", "station"),
    ("啟德站", "Kai Tak Station", "station"),
    ("顯徑站", "Hin Keng Station", "station"),
    ("車公廟站", "Che Kung Temple Station", "station"),
    ("沙田圍站", "Sha Tin Wai Station", "station"),
    ("第一城站", "City One Station", "station"),
    ("石門站", "Shek Mun Station", "station"),
    ("大水坑站", "Tai Shui Hang Station", "station"),
    ("恆安站", "Heng On Station", "station"),
    ("烏溪沙站", "Wu Kai Sha Station", "station"),
    ("大學站", "University Station", "station"),
    ("大埔墟站", "Tai Po Market Station", "station"),
    ("太和站", "Tai Wo Station", "station"),
    ("羅湖站", "Lo Wu Station", "station"),
    ("屯門站", "Tuen Mun Station", "station"),
    ("落馬洲站", "Lok Ma Chau Station", "station"),
    ("朗屏站", "Long Ping Station", "station"),
    ("兆康站", "Siu Hong Station", "station"),
    ("錦上路站", "Kam Sheung Road Station", "station"),
    ("元朗站", "Yuen Long Station", "station"),
    ("荃湾西站", "Tsuen Wan West Station", "station"),
    ("旺角東站", "Mong Kok East Station", "station"),
    ("柯士甸站", "Austin Station", "station"),
    ("美孚站", "Mei Foo Station", "station"),
    ("南昌站", "Nam Cheong Station", "station"),
    ("尖東站", "East Tsim Sha Tsui Station", "station"),
    ("紅磡站", "Hung Hom Station", "station"),
    ("香港西九龍站", "Hong Kong West Kowloon Station", "station"),
    ("中環站", "Central Station", "station"),
    ("金鐘站", "Admiralty Station", "station"),
    ("灣仔站", "Wan Chai Station", "station"),
    ("銅鑼灣站", "Causeway Bay Station", "station"),
    ("天后站", "Tin Hau Station", "station"),
    ("炮台山站", "Fortress Hill Station", "station"),
    ("北角站", "North Point Station", "station"),
    ("鰂魚涌站", "Quarry Bay Station", "station"),
    ("太古站", "Tai Koo Station", "station"),
    ("上環站", "Sheung Wan Station", "station"),
    ("西營盤站", "Sai Ying Pun Station", "station"),
    ("堅尼地城站", "Kennedy Town Station", "station"),
    ("長沙灣站", "Cheung Sha Wan Station", "station"),
    ("荔枝角站", "Lai Chi Kok Station", "station"),
    ("青衣站", "Tsing Yi Station", "station"),
    ("樂富站", "Lok Fu Station", "station"),
    ("黃大仙站", "Wong Tai Sin Station", "station"),
    ("九龍塘站", "Kowloon Tong Station", "station"),
    ("觀塘站", "Kwun Tong Station", "station"),
    ("馬鞍山站", "Ma On Shan Station", "station"),
    ("火炭站", "Fo Tan Station", "station"),
    ("馬場站", "Racecourse Station", "station"),
    ("粉嶺站", "Fanling Station", "station"),
    ("上水站", "Sheung Shui Station", "station"),
    ("奧運站", "Olympic Station", "station"),
    ("港島", "Hong Kong Island", "region"),
    ("九龍", "Kowloon", "region"),
    ("新界", "New Territories", "region"),];

/// Seed the geo dictionary
///
/// Returns the number of rows actually inserted (0 on an already-seeded database).
pub async fn seed_geo_locations(pool: &SqlitePool) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for (zh, en, category) in GEO_LOCATIONS {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO geo_locations (chinese_name, english_name, category) VALUES (?, ?, ?)",
        )
        .bind(zh)
        .bind(en)
        .bind(category)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    debug!(inserted, total = GEO_LOCATIONS.len(), "Seeded geo_locations");
    Ok(inserted)
}
