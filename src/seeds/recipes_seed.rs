use crate::database::{MongoDB, RECIPES};
use crate::models::Recipe;
use mongodb::bson::doc;

/// Seeds a handful of Filipino classics into an empty `recipes` collection.
pub async fn seed_sample_recipes(db: &MongoDB) {
    let collection = db.collection::<Recipe>(RECIPES);

    let count = collection.count_documents(doc! {}).await.unwrap_or(0);
    if count > 0 {
        log::info!("🍲 Recipes: {} already in DB, skipping sample seed", count);
        return;
    }

    log::info!("🍲 Recipes: seeding sample recipes into MongoDB...");

    let now = chrono::Utc::now().timestamp();
    let recipes = build_sample_recipes(now);

    match collection.insert_many(&recipes).await {
        Ok(result) => {
            log::info!("   ✅ Inserted {} sample recipes", result.inserted_ids.len());
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed sample recipes: {}", e);
        }
    }
}

struct Sample {
    title: &'static str,
    region: &'static str,
    description: &'static str,
    ingredients: &'static [&'static str],
    steps: &'static [&'static str],
    servings: u32,
    prep: u32,
    cook: u32,
}

impl Sample {
    fn into_recipe(self, now: i64) -> Recipe {
        Recipe {
            id: None,
            title: self.title.into(),
            description: Some(self.description.into()),
            region: self.region.into(),
            image_url: None,
            ingredients: self.ingredients.iter().map(|s| s.to_string()).collect(),
            steps: self.steps.iter().map(|s| s.to_string()).collect(),
            servings: Some(self.servings),
            prep_time_minutes: Some(self.prep),
            cook_time_minutes: Some(self.cook),
            nutrition: None,
            author_id: None,
            source_url: None,
            comments: vec![],
            created_at: now,
            updated_at: now,
        }
    }
}

fn build_sample_recipes(now: i64) -> Vec<Recipe> {
    let samples = vec![
        Sample {
            title: "Chicken Adobo",
            region: "Tagalog",
            description: "Chicken braised in vinegar, soy sauce, garlic and bay leaves.",
            ingredients: &[
                "1 kg chicken thighs",
                "1/2 cup soy sauce",
                "1/3 cup cane vinegar",
                "1 head garlic, crushed",
                "3 pieces bay leaf",
                "1 tsp whole peppercorns",
                "1 cup water",
                "2 tbsp cooking oil",
            ],
            steps: &[
                "Marinate the chicken in soy sauce and garlic for 30 minutes.",
                "Brown the chicken in oil, then add the marinade, water, bay leaves and peppercorns.",
                "Simmer covered for 30 minutes.",
                "Add the vinegar and simmer uncovered, without stirring, until the sauce reduces.",
            ],
            servings: 4,
            prep: 40,
            cook: 45,
        },
        Sample {
            title: "Sinigang na Baboy",
            region: "Tagalog",
            description: "Sour tamarind soup with pork ribs and vegetables.",
            ingredients: &[
                "1 kg pork ribs",
                "2 liters water",
                "1 onion, quartered",
                "2 tomatoes, quartered",
                "1 radish, sliced",
                "1 bunch kangkong",
                "6 pieces string beans",
                "2 pieces siling haba",
                "1 pack tamarind soup base",
                "2 tbsp fish sauce",
            ],
            steps: &[
                "Boil the pork in water with onion and tomatoes, skimming the scum, until tender.",
                "Add the tamarind base, radish and string beans and cook for 5 minutes.",
                "Add the kangkong and siling haba, season with fish sauce and serve hot.",
            ],
            servings: 6,
            prep: 15,
            cook: 90,
        },
        Sample {
            title: "Pinakbet",
            region: "Ilocos",
            description: "Ilocano vegetable stew flavored with shrimp paste.",
            ingredients: &[
                "200 g pork belly, cubed",
                "1 eggplant, sliced",
                "1 ampalaya, sliced",
                "10 pieces okra",
                "1 cup squash, cubed",
                "2 tomatoes, chopped",
                "1 onion, chopped",
                "3 cloves garlic, minced",
                "2 tbsp bagoong isda",
                "1 cup water",
            ],
            steps: &[
                "Render the pork belly until crisp, then sauté garlic, onion and tomatoes.",
                "Add the bagoong and water and bring to a boil.",
                "Add the squash and cook for 5 minutes, then the remaining vegetables.",
                "Cover and simmer until the vegetables are tender.",
            ],
            servings: 4,
            prep: 20,
            cook: 25,
        },
        Sample {
            title: "Bicol Express",
            region: "Bicol",
            description: "Pork simmered in coconut milk with shrimp paste and chilies.",
            ingredients: &[
                "500 g pork shoulder, cut into strips",
                "2 cups coconut milk",
                "1 cup coconut cream",
                "10 pieces siling haba, sliced",
                "3 pieces chili",
                "2 tbsp shrimp paste",
                "1 onion, chopped",
                "4 cloves garlic, minced",
            ],
            steps: &[
                "Sauté garlic and onion, then add the pork and cook until lightly browned.",
                "Add the shrimp paste and coconut milk and simmer for 30 minutes.",
                "Add the coconut cream and chilies and cook until the sauce thickens.",
            ],
            servings: 4,
            prep: 15,
            cook: 45,
        },
        Sample {
            title: "Laing",
            region: "Bicol",
            description: "Dried taro leaves slow cooked in coconut milk.",
            ingredients: &[
                "100 g dried taro leaves",
                "4 cups coconut milk",
                "1 cup coconut cream",
                "150 g pork belly, chopped",
                "1 tbsp shrimp paste",
                "2 tbsp ginger, minced",
                "5 pieces chili",
            ],
            steps: &[
                "Simmer the coconut milk with pork, ginger and shrimp paste for 10 minutes.",
                "Add the taro leaves without stirring and simmer for 30 minutes.",
                "Add the coconut cream and chilies and cook until almost dry.",
            ],
            servings: 4,
            prep: 10,
            cook: 50,
        },
        Sample {
            title: "Chicken Inasal",
            region: "Visayas",
            description: "Bacolod-style grilled chicken basted with annatto oil.",
            ingredients: &[
                "1 kg chicken leg quarters",
                "1/2 cup coconut vinegar",
                "1/4 cup calamansi juice",
                "1 stalk lemongrass, pounded",
                "2 tbsp ginger, grated",
                "1 head garlic, minced",
                "3 tbsp annatto oil",
                "1 tsp salt",
            ],
            steps: &[
                "Marinate the chicken in vinegar, calamansi, lemongrass, ginger, garlic and salt overnight.",
                "Grill over hot coals, basting often with annatto oil, until cooked through.",
            ],
            servings: 4,
            prep: 20,
            cook: 35,
        },
        Sample {
            title: "Chicken Tinola",
            region: "Tagalog",
            description: "Ginger chicken soup with green papaya and chili leaves.",
            ingredients: &[
                "1 kg chicken, cut into pieces",
                "1 thumb ginger, julienned",
                "1 onion, sliced",
                "3 cloves garlic, minced",
                "1 green papaya, sliced",
                "1 cup chili leaves",
                "6 cups water",
                "2 tbsp fish sauce",
            ],
            steps: &[
                "Sauté garlic, onion and ginger, then add the chicken and fish sauce.",
                "Pour in the water and simmer for 30 minutes.",
                "Add the papaya and cook until tender, then stir in the chili leaves.",
            ],
            servings: 5,
            prep: 15,
            cook: 45,
        },
        Sample {
            title: "Kinilaw na Tanigue",
            region: "Visayas",
            description: "Fresh fish cured in vinegar with ginger, onion and chilies.",
            ingredients: &[
                "500 g tanigue fillet, cubed",
                "1 cup coconut vinegar",
                "2 tbsp ginger, minced",
                "1 red onion, chopped",
                "2 pieces chili, chopped",
                "1 cucumber, diced",
                "1 tsp salt",
            ],
            steps: &[
                "Rinse the fish with half of the vinegar and drain.",
                "Combine the fish with the remaining vinegar, ginger, onion, chilies and salt.",
                "Chill for 15 minutes, add the cucumber and serve.",
            ],
            servings: 4,
            prep: 20,
            cook: 0,
        },
    ];

    samples.into_iter().map(|s| s.into_recipe(now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::nutrition_service::parse_ingredient_line;

    #[test]
    fn test_samples_are_complete() {
        let recipes = build_sample_recipes(0);
        assert!(recipes.len() >= 6);
        for recipe in &recipes {
            assert!(!recipe.title.is_empty());
            assert!(!recipe.ingredients.is_empty(), "{}", recipe.title);
            assert!(!recipe.steps.is_empty(), "{}", recipe.title);
        }
    }

    #[test]
    fn test_sample_ingredients_parse() {
        for recipe in build_sample_recipes(0) {
            for line in &recipe.ingredients {
                assert!(parse_ingredient_line(line).is_some(), "{}", line);
            }
        }
    }
}
