//! Random remembrance texts.

use rand::seq::SliceRandom;
use rand::Rng;

const TASBIH: &[&str] = &[
    "📿 *تسبيح*\n\n🔹 سبحان الله (33)\n🔹 الحمد لله (33)\n🔹 الله أكبر (34)",
    "📿 *تسبيح*\n\n🔹 سبحان الله وبحمده (100 مرة)",
    "📿 *تسبيح*\n\n🔹 سبحان الله العظيم وبحمده",
    "📿 *تسبيح*\n\n🔹 سبحان الله والحمد لله ولا إله إلا الله والله أكبر",
    "📿 *تسبيح*\n\n🔹 لا إله إلا الله وحده لا شريك له (10 مرات)",
];

const ISTIGHFAR: &[&str] = &[
    "🤲 *استغفار*\n\n🔹 أستغفر الله العظيم وأتوب إليه (3 مرات)",
    "🤲 *سيد الاستغفار*\n\n🔹 اللهم أنت ربي لا إله إلا أنت، خلقتني وأنا عبدك، وأنا على عهدك ووعدك ما استطعت، أعوذ بك من شر ما صنعت، أبوء لك بنعمتك عليّ، وأبوء بذنبي فاغفر لي، فإنه لا يغفر الذنوب إلا أنت.",
    "🤲 *استغفار*\n\n🔹 أستغفر الله وأتوب إليه (100 مرة)",
    "🤲 *استغفار*\n\n🔹 رب اغفر لي وتب علي (100 مرة)",
    "🤲 *استغفار*\n\n🔹 اللهم اغفر لي ذنبي كلّه، دقّه وجلّه، وأوله وآخره، وعلانيته وسرّه",
];

const GENERAL: &[&str] = &[
    "💎 *ذكر*\n\n🔹 لا حول ولا قوة إلا بالله",
    "💎 *الباقيات الصالحات*\n\n🔹 سبحان الله والحمد لله ولا إله إلا الله والله أكبر",
    "💎 *الصلاة على النبي ﷺ*\n\n🔹 اللهم صل وسلم وبارك على سيدنا محمد",
    "💎 *كلمتان خفيفتان*\n\n🔹 سبحان الله وبحمده، سبحان الله العظيم",
    "💎 *أفضل الذكر*\n\n🔹 لا إله إلا الله",
];

const FAMILIES: [&[&str]; 3] = [TASBIH, ISTIGHFAR, GENERAL];

/// Pick a family uniformly, then a text uniformly within it.
pub fn random_dhikr<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    FAMILIES
        .choose(rng)
        .and_then(|family| family.choose(rng))
        .copied()
        .unwrap_or(GENERAL[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_from_every_family() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut hits = [0usize; 3];
        for _ in 0..300 {
            let text = random_dhikr(&mut rng);
            let family = FAMILIES
                .iter()
                .position(|f| f.contains(&text))
                .expect("text belongs to a family");
            hits[family] += 1;
        }
        assert!(hits.iter().all(|&h| h > 0), "{hits:?}");
    }
}
